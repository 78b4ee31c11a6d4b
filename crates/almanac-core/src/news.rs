//! Optional headline annotation for detected anomalies.

use serde::{Deserialize, Serialize};
use time::Date;
use tracing::warn;

use crate::{domain::iso_date, Anomaly, SourceError, Ticker};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub link: String,
}

/// Headline lookup keyed by ticker and trading day.
pub trait NewsLookup: Send + Sync {
    fn headlines(&self, ticker: &Ticker, date: Date) -> Result<Vec<Headline>, SourceError>;
}

/// Lookup that never finds anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoNews;

impl NewsLookup for NoNews {
    fn headlines(&self, _ticker: &Ticker, _date: Date) -> Result<Vec<Headline>, SourceError> {
        Ok(Vec::new())
    }
}

/// An anomaly with whatever headlines were found for its date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedAnomaly {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub close: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headlines: Vec<Headline>,
}

/// Look up headlines for each anomaly. A failed lookup is logged and leaves
/// that anomaly without headlines.
pub fn annotate(
    news: &dyn NewsLookup,
    ticker: &Ticker,
    anomalies: &[Anomaly],
) -> Vec<AnnotatedAnomaly> {
    anomalies
        .iter()
        .map(|anomaly| {
            let headlines = news.headlines(ticker, anomaly.date).unwrap_or_else(|error| {
                warn!(%ticker, date = %anomaly.date, %error, "headline lookup failed");
                Vec::new()
            });
            AnnotatedAnomaly {
                date: anomaly.date,
                close: anomaly.close,
                headlines,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_date, AnomalyLabel};

    struct Flaky;

    impl NewsLookup for Flaky {
        fn headlines(&self, _ticker: &Ticker, date: Date) -> Result<Vec<Headline>, SourceError> {
            if date.day() % 2 == 0 {
                Err(SourceError::unavailable("news feed down"))
            } else {
                Ok(vec![Headline {
                    title: format!("Shares move on {date}"),
                    link: "https://news.example/1".to_owned(),
                }])
            }
        }
    }

    fn anomaly(date: &str) -> Anomaly {
        Anomaly {
            date: parse_date(date).expect("date"),
            close: 10.0,
            label: AnomalyLabel::Anomalous,
        }
    }

    #[test]
    fn failed_lookups_yield_no_headlines() {
        let ticker = Ticker::parse("AAPL").expect("ticker");
        let annotated = annotate(
            &Flaky,
            &ticker,
            &[anomaly("2021-03-01"), anomaly("2021-03-02")],
        );
        assert_eq!(annotated.len(), 2);
        assert_eq!(annotated[0].headlines.len(), 1);
        assert!(annotated[1].headlines.is_empty());
    }

    #[test]
    fn no_news_is_empty() {
        let ticker = Ticker::parse("AAPL").expect("ticker");
        let annotated = annotate(&NoNews, &ticker, &[anomaly("2021-03-01")]);
        assert!(annotated[0].headlines.is_empty());
    }
}
