use intake_core::validate::DEFAULT_TERMINATOR;
use intake_core::{DeliveryMethod, FormState, Prompt, ValidationError};

pub const ASK_FULL_NAME: &str = "Введите ФИО:";
pub const ASK_BIRTHDATE: &str = "Введите дату рождения (ДД.ММ.ГГГГ):";
pub const ASK_TAX_ID: &str = "Введите ИНН:";
pub const ASK_DELIVERY: &str = "Выберите способ получения справки:";
pub const ASK_EMAIL: &str = "Введите email:";
pub const ASK_RECEIPTS: &str = "Пришлите фото чеков или напишите «Чеков нет»:";
pub const THANKS: &str = "✅ Спасибо! Справка будет оформлена в течение 30 дней.";
pub const CANCELLED: &str = "❌ Операция отменена.";
pub const SESSION_EXPIRED: &str =
    "⌛ Прошлая анкета закрыта из-за долгого перерыва, заполняем заново.";
pub const INCOMPLETE: &str = "⚠️ Анкета заполнена не полностью, начнём заново.";

/// The question asked while waiting in `state`.
///
/// Terminal states have nothing to ask and get the form's first question.
pub fn ask(state: FormState) -> Prompt {
    match state {
        FormState::FullName | FormState::Finalize | FormState::Cancelled => {
            Prompt::clearing(ASK_FULL_NAME)
        }
        FormState::Birthdate => Prompt::text(ASK_BIRTHDATE),
        FormState::TaxId => Prompt::text(ASK_TAX_ID),
        FormState::DeliveryMethod => Prompt::with_options(
            ASK_DELIVERY,
            DeliveryMethod::ALL.into_iter().map(DeliveryMethod::label),
        ),
        FormState::Email => Prompt::clearing(ASK_EMAIL),
        FormState::Receipts => Prompt::with_options(ASK_RECEIPTS, [DEFAULT_TERMINATOR]),
    }
}

/// Acknowledges one received receipt.
pub fn receipt_received(count: usize) -> Prompt {
    Prompt::text(format!(
        "📎 Чек получен ({count}). Пришлите ещё или напишите «{DEFAULT_TERMINATOR}»."
    ))
}

/// Explains a rejected value and repeats the current question.
pub fn reprompt(state: FormState, reason: ValidationError) -> Prompt {
    let hint = match reason {
        ValidationError::EmptyInput => "❌ Пустой ответ.",
        ValidationError::BadDateFormat => "❌ Формат даты: 31.12.2000",
        ValidationError::BadTaxIdDigits => "❌ ИНН должен содержать только цифры.",
        ValidationError::BadTaxIdLength => "❌ ИНН должен состоять из 10 или 12 цифр.",
        ValidationError::BadEmailSyntax => "❌ Некорректный email. Пример: name@example.com",
        ValidationError::UnrecognizedOption => "❌ Выберите один из вариантов на клавиатуре.",
        ValidationError::UnrecognizedTerminator => "❌ Пришлите фото чека или напишите «Чеков нет».",
        ValidationError::ExpectedText => "⚠️ Здесь нужен текстовый ответ.",
    };
    let question = ask(state);
    Prompt {
        text: format!("{hint}\n{}", question.text),
        markup: question.markup,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intake_core::ReplyMarkup;

    #[test]
    fn test_delivery_question_offers_both_options() {
        let prompt = ask(FormState::DeliveryMethod);
        assert_eq!(
            prompt.markup,
            ReplyMarkup::Options(vec!["Оригинал на бумаге".into(), "На email".into()])
        );
    }

    #[test]
    fn test_reprompt_keeps_question_markup() {
        let prompt = reprompt(FormState::DeliveryMethod, ValidationError::UnrecognizedOption);
        assert!(prompt.text.ends_with(ASK_DELIVERY));
        assert!(matches!(prompt.markup, ReplyMarkup::Options(_)));
    }

    #[test]
    fn test_date_hint_shows_example() {
        let prompt = reprompt(FormState::Birthdate, ValidationError::BadDateFormat);
        assert!(prompt.text.starts_with("❌ Формат даты: 31.12.2000"));
    }
}
