use crate::basic_models::Recipe;

/// Case-insensitive substring match on the title. An empty query matches everything.
pub fn title_matches(title: &str, query: &str) -> bool {
    title.to_lowercase().contains(&query.to_lowercase())
}

/// Keep the recipes whose title matches the query, in their original order
pub fn filter_by_title<'a>(recipes: &'a [Recipe], query: &str) -> Vec<&'a Recipe> {
    recipes
        .iter()
        .filter(|recipe| title_matches(&recipe.title, query))
        .collect()
}
