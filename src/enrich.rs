use rand::Rng;

use crate::types::{EnrichedPicture, PictureRecord};
use crate::utils::truncate_str;

/// Maximum notification body length, including the "..." suffix.
const BODY_MAX_CHARS: usize = 100;

/// Static catalog the daily fact is drawn from.
pub const SPACE_FACTS: [&str; 20] = [
    "Light from the Sun takes about 8 minutes to reach Earth.",
    "A day on Venus is longer than a year on Venus.",
    "The largest volcano in our solar system is on Mars - Olympus Mons.",
    "The Great Red Spot on Jupiter is a storm that has been raging for at least 400 years.",
    "Saturn's rings are made mostly of ice particles, with a small amount of rocky debris.",
    "Neptune's winds are the fastest in the solar system, reaching speeds of 1,200 mph.",
    "The temperature at the Sun's core is about 27 million degrees Fahrenheit.",
    "One million Earths could fit inside the Sun.",
    "The Milky Way galaxy is estimated to contain 100-400 billion stars.",
    "The Hubble Space Telescope orbits Earth at about 17,000 mph.",
    "The universe is estimated to be about 13.8 billion years old.",
    "Black holes have gravitational pulls so strong that even light cannot escape.",
    "Neutron stars can rotate up to 600 times per second.",
    "There are more stars in the universe than grains of sand on all of Earth's beaches.",
    "The closest known galaxy to the Milky Way is the Canis Major Dwarf Galaxy.",
    "The largest known star, UY Scuti, has a radius about 1,700 times that of the Sun.",
    "A teaspoonful of neutron star material would weigh about a billion tons.",
    "The footprints left by Apollo astronauts on the Moon will likely last for millions of years.",
    "The Moon is moving away from Earth at a rate of about 1.5 inches per year.",
    "Pluto's orbit is so eccentric that it sometimes comes closer to the Sun than Neptune.",
];

/// Combine a fetched record with a random fact and derived notification text.
/// Pure apart from the fact draw; no I/O, cannot fail.
pub fn enrich(record: PictureRecord) -> EnrichedPicture {
    let fact = random_fact().to_string();
    let notification_title = format!("Today's Space Discovery: {}", record.title);
    let notification_body = notification_body(&record.explanation);

    EnrichedPicture {
        record,
        fact,
        notification_title,
        notification_body,
    }
}

fn random_fact() -> &'static str {
    let idx = rand::thread_rng().gen_range(0..SPACE_FACTS.len());
    SPACE_FACTS[idx]
}

/// First sentence of the explanation, capped at 100 characters.
/// The split on ". " strips the period, so it is re-appended.
fn notification_body(explanation: &str) -> String {
    let first = explanation.split(". ").next().unwrap_or(explanation);
    let sentence = format!("{}.", first);
    truncate_str(&sentence, BODY_MAX_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaType;
    use chrono::NaiveDate;

    fn record(explanation: &str) -> PictureRecord {
        PictureRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            title: "Horsehead Nebula".into(),
            explanation: explanation.into(),
            media_type: MediaType::Image,
            service_version: "v1".into(),
            url: Some("https://apod.nasa.gov/x.jpg".into()),
            hdurl: None,
        }
    }

    #[test]
    fn title_and_body_are_deterministic() {
        let a = enrich(record("A dark nebula. It hides young stars."));
        let b = enrich(record("A dark nebula. It hides young stars."));
        assert_eq!(a.notification_title, "Today's Space Discovery: Horsehead Nebula");
        assert_eq!(a.notification_title, b.notification_title);
        assert_eq!(a.notification_body, b.notification_body);
        assert_eq!(a.notification_body, "A dark nebula.");
    }

    #[test]
    fn fact_comes_from_the_catalog() {
        for _ in 0..50 {
            let enriched = enrich(record("Stars."));
            assert!(SPACE_FACTS.contains(&enriched.fact.as_str()));
        }
    }

    #[test]
    fn body_takes_first_sentence_only() {
        let enriched = enrich(record("Short intro. Second sentence. Third."));
        assert_eq!(enriched.notification_body, "Short intro.");
    }

    #[test]
    fn body_never_exceeds_100_chars() {
        // Exactly 101 characters with no ". " anywhere.
        let explanation = "a".repeat(101);
        let enriched = enrich(record(&explanation));
        assert_eq!(enriched.notification_body.chars().count(), 100);
        assert!(enriched.notification_body.ends_with("..."));
    }

    #[test]
    fn body_at_the_boundary_is_untouched() {
        // 99 chars + appended "." = 100, fits exactly.
        let explanation = "b".repeat(99);
        let enriched = enrich(record(&explanation));
        assert_eq!(enriched.notification_body.chars().count(), 100);
        assert!(!enriched.notification_body.ends_with("..."));
    }
}
