//! Product recommendations ranked against a user's spending and goals.
//!
//! The ranking is keyword-free: products are drawn from the catalog buckets
//! matching the user's top spending categories and goal texts, padded out so
//! there is always enough for a few pages of results. The LLM-generated
//! search query is produced alongside for observability.

use axum::{Json, extract::Query, extract::State};
use serde::Serialize;

use std::collections::{HashMap, HashSet};

use crate::{
    AppState, Error,
    analysis::{open_goal_texts, spending_by_category, top_categories},
    auth::Claims,
    catalog::{Product, ProductCatalog},
    goal::get_goals_by_user,
    keywords::generate_query,
    pagination::{PageParams, paginate},
    transaction::get_transactions_by_user,
    user::get_user_by_email,
};

/// The minimum number of products to recommend, three pages at the default
/// page size.
const MIN_PRODUCTS: usize = 36;

/// A page of recommended products.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationPage {
    /// The products on this page.
    pub products: Vec<Product>,
    /// The zero-based page number that was requested.
    pub page: usize,
    /// The page size that was requested.
    pub size: usize,
    /// How many products were ranked in total.
    pub total: usize,
    /// Whether further pages exist.
    pub has_more: bool,
}

/// A route handler for recommending products to the caller.
pub async fn get_recommendations_endpoint(
    claims: Claims,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<RecommendationPage>, Error> {
    let (transactions, goals) = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;
        let user = get_user_by_email(&claims.sub, &connection)?;

        (
            get_transactions_by_user(user.id, &connection)?,
            get_goals_by_user(user.id, &connection)?,
        )
    };

    let spending = spending_by_category(&transactions);
    let goal_texts = open_goal_texts(&goals);

    let query = generate_query(
        &state.http_client,
        state.gemini_api_key.as_deref(),
        &spending,
        &goal_texts,
    )
    .await;
    tracing::debug!(origin = ?query.origin, "recommendation search query: {}", query.text);

    let products = rank_products(&state.catalog, &spending, &goal_texts);
    let total = products.len();
    let (page_products, has_more) = paginate(&products, params);

    Ok(Json(RecommendationPage {
        products: page_products,
        page: params.page,
        size: params.size,
        total,
        has_more,
    }))
}

/// Rank catalog products against per-category spending totals and open goal
/// texts.
///
/// Products are gathered from the buckets for the top three spending
/// categories, then from buckets triggered by goal keywords, then topped up
/// with the default bucket. Duplicates are removed keeping the first
/// occurrence, and the list is padded with re-IDed copies until it holds at
/// least [`MIN_PRODUCTS`] entries.
pub fn rank_products(
    catalog: &ProductCatalog,
    spending: &HashMap<String, f64>,
    goal_texts: &[String],
) -> Vec<Product> {
    let mut products = Vec::new();

    for (category, _) in top_categories(spending, 3) {
        products.extend_from_slice(catalog.bucket_or_default(&category));
    }

    for goal_text in goal_texts {
        let goal_text = goal_text.to_lowercase();

        if goal_text.contains("travel") {
            products.extend_from_slice(catalog.bucket_or_default("Travel"));
        }

        if goal_text.contains("house") || goal_text.contains("home") {
            products.extend_from_slice(catalog.bucket_or_default("Rent"));
        }

        if goal_text.contains("fitness") || goal_text.contains("health") || goal_text.contains("exercise") {
            products.extend(
                catalog
                    .default_bucket()
                    .iter()
                    .filter(|product| {
                        let name = product.name.to_lowercase();
                        name.contains("fitness") || name.contains("tracker")
                    })
                    .cloned(),
            );
        }
    }

    if products.is_empty() {
        products.extend_from_slice(catalog.default_bucket());
    }

    // The default bucket is always appended so there is enough variety for
    // infinite scrolling on the client.
    products.extend_from_slice(catalog.default_bucket());

    let mut seen = HashSet::new();
    let mut ranked: Vec<Product> = products
        .into_iter()
        .filter(|product| seen.insert(product.id))
        .collect();

    let original_count = ranked.len();

    for i in 0.. {
        if ranked.len() >= MIN_PRODUCTS {
            break;
        }

        let mut duplicate = ranked[i % original_count].clone();
        duplicate.id = 1000 + ranked.len() as i64;
        ranked.push(duplicate);
    }

    ranked
}

#[cfg(test)]
mod ranker_tests {
    use std::collections::{HashMap, HashSet};

    use crate::{
        catalog::ProductCatalog,
        recommend::{MIN_PRODUCTS, rank_products},
    };

    #[test]
    fn top_spending_category_products_come_first() {
        let catalog = ProductCatalog::builtin();
        let spending = HashMap::from([("Food".to_owned(), 100.0)]);

        let ranked = rank_products(&catalog, &spending, &[]);

        let food_ids: Vec<i64> = catalog.bucket("Food").unwrap().iter().map(|p| p.id).collect();
        let leading_ids: Vec<i64> = ranked[..food_ids.len()].iter().map(|p| p.id).collect();
        assert_eq!(leading_ids, food_ids);

        let default_ids: HashSet<i64> = catalog.default_bucket().iter().map(|p| p.id).collect();
        let ranked_ids: HashSet<i64> = ranked.iter().map(|p| p.id).collect();
        assert!(default_ids.is_subset(&ranked_ids));
        assert!(ranked.len() >= 36);
    }

    #[test]
    fn unknown_categories_draw_from_the_default_bucket() {
        let catalog = ProductCatalog::builtin();
        let spending = HashMap::from([("Entertainment".to_owned(), 100.0)]);

        let ranked = rank_products(&catalog, &spending, &[]);

        assert_eq!(ranked[0].id, catalog.default_bucket()[0].id);
    }

    #[test]
    fn travel_goal_pulls_in_travel_products() {
        let catalog = ProductCatalog::builtin();

        let ranked = rank_products(&catalog, &HashMap::new(), &["Travel to Japan".to_owned()]);

        let travel_ids: HashSet<i64> = catalog.bucket("Travel").unwrap().iter().map(|p| p.id).collect();
        let ranked_ids: HashSet<i64> = ranked.iter().map(|p| p.id).collect();
        assert!(travel_ids.is_subset(&ranked_ids));
    }

    #[test]
    fn fitness_goal_pulls_in_trackers() {
        let catalog = ProductCatalog::builtin();

        let ranked = rank_products(&catalog, &HashMap::new(), &["Get fit and healthy".to_owned()]);

        assert!(
            ranked
                .iter()
                .any(|product| product.name.to_lowercase().contains("tracker"))
        );
    }

    #[test]
    fn products_are_deduplicated_by_id() {
        let catalog = ProductCatalog::builtin();
        // Food appears both as a top category and via the default append.
        let spending = HashMap::from([("Food".to_owned(), 100.0)]);

        let ranked = rank_products(&catalog, &spending, &[]);

        let mut seen = HashSet::new();
        assert!(ranked.iter().all(|product| seen.insert(product.id)));
    }

    #[test]
    fn result_is_padded_to_the_minimum_with_high_ids() {
        let catalog = ProductCatalog::builtin();

        let ranked = rank_products(&catalog, &HashMap::new(), &[]);

        assert_eq!(ranked.len(), MIN_PRODUCTS);
        assert!(ranked.iter().any(|product| product.id >= 1000));
    }
}
