//! Turning a user's spending profile and goals into product search keywords.
//!
//! When a Gemini API key is configured the keywords are generated by the
//! LLM; otherwise, or when every Gemini attempt fails, a deterministic
//! heuristic takes over. The outcome records which path produced the query
//! so that callers can log it.

use std::{
    collections::{BTreeSet, HashMap},
    time::Duration,
};

use serde_json::{Value, json};

use crate::analysis::top_categories;

/// Candidate Gemini models, tried in order of preference.
const GEMINI_MODELS: [&str; 2] = ["gemini-2.5-flash", "gemini-2.5-pro"];

/// API versions to try for each model. Newer models occasionally only
/// exist on one of the two.
const GEMINI_API_VERSIONS: [&str; 2] = ["v1", "v1beta"];

/// How long to wait on a single Gemini request before moving on to the
/// next model/version pair.
const GEMINI_TIMEOUT: Duration = Duration::from_secs(30);

/// A comma-separated keyword query along with how it was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    /// Comma-separated keywords, e.g. `"food, travel, savings"`.
    pub text: String,
    /// Whether the query came from Gemini or the heuristic.
    pub origin: QueryOrigin,
}

/// How a [`SearchQuery`] was produced.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOrigin {
    /// Generated by the Gemini API.
    Gemini {
        /// The API version that answered, e.g. `v1`.
        api_version: &'static str,
        /// The model that answered, e.g. `gemini-2.5-flash`.
        model: &'static str,
    },
    /// Produced by the keyword heuristic, with the reason Gemini was not
    /// used.
    Heuristic {
        /// Why the heuristic was used instead of Gemini.
        reason: FallbackReason,
    },
}

/// Why the heuristic produced the query instead of Gemini.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    /// No Gemini API key was configured at start-up.
    NoApiKey,
    /// Every model and API version combination failed.
    GeminiFailed(String),
}

/// Generate a keyword query for the given spending totals and open goals.
///
/// Tries Gemini when `api_key` is set, falling back to
/// [`heuristic_query`] on any failure.
pub async fn generate_query(
    client: &reqwest::Client,
    api_key: Option<&str>,
    spending: &HashMap<String, f64>,
    goal_texts: &[String],
) -> SearchQuery {
    let Some(api_key) = api_key.filter(|key| !key.is_empty()) else {
        return SearchQuery {
            text: heuristic_query(spending, goal_texts),
            origin: QueryOrigin::Heuristic {
                reason: FallbackReason::NoApiKey,
            },
        };
    };

    match gemini_query(client, api_key, spending, goal_texts).await {
        Ok(query) => query,
        Err(error) => {
            tracing::warn!("falling back to keyword heuristic: {error}");

            SearchQuery {
                text: heuristic_query(spending, goal_texts),
                origin: QueryOrigin::Heuristic {
                    reason: FallbackReason::GeminiFailed(error),
                },
            }
        }
    }
}

/// Extract keywords without an LLM: the top three spending categories
/// (lowercased) plus keywords triggered by words in the goal texts.
///
/// Keywords are deduplicated and emitted in lexicographic order so the
/// result is stable across runs.
pub fn heuristic_query(spending: &HashMap<String, f64>, goal_texts: &[String]) -> String {
    let mut keywords = BTreeSet::new();

    for (category, _) in top_categories(spending, 3) {
        keywords.insert(category.to_lowercase());
    }

    for goal_text in goal_texts {
        let goal_text = goal_text.to_lowercase();

        if goal_text.contains("travel") {
            keywords.insert("travel".to_owned());
        }

        if goal_text.contains("house") || goal_text.contains("home") {
            keywords.insert("home".to_owned());
        }

        if goal_text.contains("retire") {
            keywords.insert("investment".to_owned());
        }

        if goal_text.contains("debt") {
            keywords.insert("debt".to_owned());
        }

        if goal_text.contains("save") {
            keywords.insert("savings".to_owned());
        }

        if goal_text.contains("fitness") || goal_text.contains("health") {
            keywords.insert("fitness".to_owned());
        }
    }

    keywords.into_iter().collect::<Vec<_>>().join(", ")
}

async fn gemini_query(
    client: &reqwest::Client,
    api_key: &str,
    spending: &HashMap<String, f64>,
    goal_texts: &[String],
) -> Result<SearchQuery, String> {
    let request_body = json!({
        "contents": [{
            "parts": [{ "text": build_prompt(spending, goal_texts) }]
        }]
    });

    let mut last_error = "no model responded".to_owned();

    for model in GEMINI_MODELS {
        for api_version in GEMINI_API_VERSIONS {
            let url = format!(
                "https://generativelanguage.googleapis.com/{api_version}/models/{model}:generateContent?key={api_key}"
            );

            tracing::debug!("trying Gemini {api_version}/{model}");

            let response = match client
                .post(&url)
                .timeout(GEMINI_TIMEOUT)
                .json(&request_body)
                .send()
                .await
            {
                Ok(response) => response,
                Err(error) => {
                    last_error = format!("{api_version}/{model}: {error}");
                    continue;
                }
            };

            let status = response.status();

            if !status.is_success() {
                if status != reqwest::StatusCode::NOT_FOUND {
                    tracing::warn!("Gemini {api_version}/{model} returned {status}");
                }

                last_error = format!("{api_version}/{model}: HTTP {status}");
                continue;
            }

            let body: Value = match response.json().await {
                Ok(body) => body,
                Err(error) => {
                    last_error = format!("{api_version}/{model}: {error}");
                    continue;
                }
            };

            match extract_generated_text(&body) {
                Some(text) => {
                    tracing::info!("Gemini {api_version}/{model} generated query: {text}");

                    return Ok(SearchQuery {
                        text,
                        origin: QueryOrigin::Gemini { api_version, model },
                    });
                }
                None => {
                    last_error = format!("{api_version}/{model}: unexpected response structure");
                }
            }
        }
    }

    Err(last_error)
}

fn build_prompt(spending: &HashMap<String, f64>, goal_texts: &[String]) -> String {
    let mut prompt =
        String::from("Based on the following financial data, generate 3-5 product search keywords:\n\n");
    prompt.push_str("Top Spending Categories:\n");

    for (category, total) in top_categories(spending, 5) {
        prompt.push_str(&format!("- {category}: ${total}\n"));
    }

    if !goal_texts.is_empty() {
        prompt.push_str("\nUser Goals:\n");

        for goal_text in goal_texts {
            prompt.push_str(&format!("- {goal_text}\n"));
        }
    }

    prompt.push_str(
        "\nGenerate comma-separated product search keywords that would help this user save money or achieve their goals.",
    );

    prompt
}

/// Pull the generated text out of a Gemini response and strip the markdown
/// fences and quotes models sometimes wrap it in.
fn extract_generated_text(body: &Value) -> Option<String> {
    let text = body
        .pointer("/candidates/0/content/parts/0/text")?
        .as_str()?
        .trim()
        .replace("```", "")
        .replace("json", "")
        .replace('"', "")
        .trim()
        .to_owned();

    Some(text)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use crate::keywords::{build_prompt, extract_generated_text, heuristic_query};

    #[test]
    fn heuristic_combines_top_categories_and_goal_triggers() {
        let spending = HashMap::from([
            ("Food".to_owned(), 50.0),
            ("Travel".to_owned(), 200.0),
            ("Rent".to_owned(), 1200.0),
            ("Fun".to_owned(), 1.0),
        ]);
        let goals = ["Save for retirement".to_owned()];

        let query = heuristic_query(&spending, &goals);

        assert_eq!(query, "food, investment, rent, savings, travel");
    }

    #[test]
    fn heuristic_deduplicates_keywords() {
        let spending = HashMap::from([("Travel".to_owned(), 100.0)]);
        let goals = ["Travel to Japan".to_owned()];

        assert_eq!(heuristic_query(&spending, &goals), "travel");
    }

    #[test]
    fn heuristic_recognizes_house_and_home() {
        let spending = HashMap::new();

        assert_eq!(heuristic_query(&spending, &["Buy a house".to_owned()]), "home");
        assert_eq!(heuristic_query(&spending, &["new home deposit".to_owned()]), "home");
    }

    #[test]
    fn heuristic_with_no_input_is_empty() {
        assert_eq!(heuristic_query(&HashMap::new(), &[]), "");
    }

    #[test]
    fn prompt_lists_categories_by_descending_spend() {
        let spending = HashMap::from([
            ("Food".to_owned(), 50.0),
            ("Rent".to_owned(), 1200.0),
        ]);
        let goals = ["Pay off debt".to_owned()];

        let prompt = build_prompt(&spending, &goals);

        let rent_position = prompt.find("- Rent: $1200").unwrap();
        let food_position = prompt.find("- Food: $50").unwrap();
        assert!(rent_position < food_position);
        assert!(prompt.contains("- Pay off debt"));
    }

    #[test]
    fn prompt_omits_goal_section_when_there_are_no_goals() {
        let prompt = build_prompt(&HashMap::new(), &[]);

        assert!(!prompt.contains("User Goals"));
    }

    #[test]
    fn generated_text_is_extracted_and_cleaned() {
        let body = json!({
            "candidates": [{
                "content": {
                    "parts": [{ "text": "```json\n\"travel, savings\"\n```" }]
                }
            }]
        });

        assert_eq!(
            extract_generated_text(&body),
            Some("travel, savings".to_owned())
        );
    }

    #[test]
    fn unexpected_response_structure_yields_none() {
        assert_eq!(extract_generated_text(&json!({ "error": "nope" })), None);
    }
}
