use chrono::{DateTime, Local};

use crate::tools::{ASK_QUESTION, HOTEL_RATES_SEARCH, HOTEL_SEARCH};

/// Booking defaults the model fills in when the user does not say otherwise.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingDefaults {
    pub language: String,
    pub currency: String,
    pub guest_nationality: String,
}

impl Default for BookingDefaults {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            currency: "USD".to_string(),
            guest_nationality: "US".to_string(),
        }
    }
}

/// Renders the system contract sent with every model call of a turn.
pub fn system_contract(defaults: &BookingDefaults, now: DateTime<Local>) -> String {
    format!(
        "You are a travel assistant that finds hotels. Your goal is to give the user hotel \
options for their destination, check-in date, check-out date and number of adults.

When a user asks for help finding a hotel:
1. Check that you know the destination, the check-in date, the check-out date and the number of adults.
2. If any of these is missing or ambiguous, call `{ASK_QUESTION}` for exactly that detail. Offer predefined options for dates and for the number of adults; allow free-form input for places.
3. Resolve the destination with `{HOTEL_SEARCH}` before searching rates.
4. Once every detail is known, call `{HOTEL_RATES_SEARCH}` with the resolved place. Use currency {currency} and guest nationality {nationality} unless the user asks otherwise.
5. Read the results carefully and recommend from them.
6. Cite facts from results as [number](url), numbered in the order the results were returned. Cite several sources separated by commas. Only cite results that carry a URL.
7. If the search returns nothing useful, answer from general travel knowledge and say so.
8. Format answers in markdown with ## headings such as \"Top Hotel Options\" or \"Booking Information\".

When calling `{ASK_QUESTION}`:
- Ask only for missing or ambiguous details.
- Keep questions short and specific to the booking.
- Write the question in the user's language ({language} by default); option values stay in English.
- List the booking fields the question fills in `fields`.

Citation format: [number](url)

Current date and time: {now}",
        currency = defaults.currency,
        nationality = defaults.guest_nationality,
        language = defaults.language,
        now = now.format("%Y-%m-%d %H:%M %Z"),
    )
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};

    use super::{system_contract, BookingDefaults};

    #[test]
    fn contract_names_tools_defaults_and_date() {
        let now = Local.with_ymd_and_hms(2025, 3, 12, 9, 30, 0).single().unwrap_or_else(Local::now);
        let defaults = BookingDefaults { currency: "EUR".to_string(), ..BookingDefaults::default() };
        let contract = system_contract(&defaults, now);

        assert!(contract.contains("`hotel_search` before searching rates"));
        assert!(contract.contains("call `ask_question`"));
        assert!(contract.contains("Use currency EUR and guest nationality US"));
        assert!(contract.contains("[number](url)"));
        assert!(contract.ends_with(&format!("Current date and time: {}", now.format("%Y-%m-%d %H:%M %Z"))));
    }
}
