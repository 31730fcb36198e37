#[cfg(test)]
mod test {

    use crate::config::service::NewsConfig;
    use crate::providers::error::ServiceError;
    use crate::providers::news::NewsService;
    use crate::tests::common::{fixed_clock, rss_feed, upstream_client};
    use httpmock::prelude::*;
    use std::collections::BTreeMap;

    fn news_config(server: &MockServer, max_articles: usize) -> NewsConfig {
        let sources = BTreeMap::from([
            ("Alpha".to_owned(), server.url("/alpha.xml")),
            ("Beta".to_owned(), server.url("/beta.xml")),
            ("Gamma".to_owned(), server.url("/gamma.xml")),
        ]);
        NewsConfig {
            categories: BTreeMap::from([("technology".to_owned(), sources)]),
            max_articles,
        }
    }

    #[tokio::test]
    async fn malformed_feed_only_drops_its_own_articles() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/alpha.xml");
                then.status(200).body(rss_feed(&[
                    ("Alpha one", "https://alpha.test/1", "Wed, 01 May 2024 06:00:00 GMT"),
                    ("Alpha two", "https://alpha.test/2", "Wed, 01 May 2024 09:00:00 GMT"),
                ]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/beta.xml");
                then.status(200).body("<rss><channel><item><title>cut off</channel>");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/gamma.xml");
                then.status(200).body(rss_feed(&[
                    ("Gamma one", "https://gamma.test/1", "Wed, 01 May 2024 08:00:00 GMT"),
                    ("Gamma two", "https://gamma.test/2", "Tue, 30 Apr 2024 23:00:00 GMT"),
                ]));
            })
            .await;

        let service = NewsService::new(upstream_client(), news_config(&server, 3), fixed_clock());
        let headlines = service.get_headlines("Technology").await.unwrap();

        let titles: Vec<_> = headlines.articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha two", "Gamma one", "Alpha one"]);
        assert_eq!(headlines.total_results, 4);
        assert_eq!(headlines.category, "technology");
        assert!(headlines.articles.iter().all(|a| a.source != "Beta"));
        assert!(headlines
            .articles
            .windows(2)
            .all(|pair| pair[0].published_at >= pair[1].published_at));
    }

    #[tokio::test]
    async fn every_feed_failing_names_every_source() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/alpha.xml");
                then.status(500);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/beta.xml");
                then.status(200).body("<html>maintenance</html>");
            })
            .await;
        // gamma has no mock and gets a 404

        let service = NewsService::new(upstream_client(), news_config(&server, 50), fixed_clock());
        let err = service.get_headlines("technology").await.unwrap_err();

        match err {
            ServiceError::Aggregate(aggregate) => {
                assert_eq!(aggregate.failed_ids(), vec!["Alpha", "Beta", "Gamma"]);
                let message = aggregate.to_string();
                assert!(message.contains("Alpha: upstream responded with status 500"));
                assert!(message.contains("Beta: malformed payload"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_category_lists_supported_ones() {
        let server = MockServer::start_async().await;
        let service = NewsService::new(upstream_client(), news_config(&server, 50), fixed_clock());

        match service.get_headlines("sports").await {
            Err(ServiceError::InvalidInput(message)) => assert!(message.contains("technology")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
