use crate::config::service::ServiceConfig;

/// Normalize lookup keys and the api prefix after deserialization.
pub fn initiate_default_values(mut config: ServiceConfig) -> ServiceConfig {
    config.settings.server.api_prefix = normalize_prefix(&config.settings.server.api_prefix);

    config.news.categories = config
        .news
        .categories
        .into_iter()
        .map(|(category, sources)| (category.trim().to_lowercase(), sources))
        .collect();

    for city in config.cities.iter_mut() {
        city.key = city.key.trim().to_lowercase();
    }

    for index in config.stocks.indices.iter_mut() {
        index.symbol = index.symbol.trim().to_uppercase();
    }

    config
}

/// `api/` -> `/api`, `/` -> ``
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_normalization() {
        assert_eq!(normalize_prefix("api"), "/api");
        assert_eq!(normalize_prefix("/api/"), "/api");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix(""), "");
    }
}
