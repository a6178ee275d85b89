//! Answer producers.
//!
//! The gateway treats answer generation as an opaque collaborator. The
//! simulated producer stands in for a model backend.

use async_trait::async_trait;

/// Produces an answer for normalized query text.
#[async_trait]
pub trait AnswerProducer: Send + Sync {
    async fn produce(&self, normalized_query: &str) -> String;

    /// Backend name for logs.
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// Echo-style producer used when no model backend is attached.
#[derive(Debug, Clone, Default)]
pub struct SimulatedProducer;

#[async_trait]
impl AnswerProducer for SimulatedProducer {
    async fn produce(&self, normalized_query: &str) -> String {
        format!("🤖 Answer to: {}", normalized_query)
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_answer_embeds_query() {
        let producer = SimulatedProducer;
        let answer = producer.produce("hello world").await;
        assert_eq!(answer, "🤖 Answer to: hello world");
        assert_eq!(producer.name(), "simulated");
    }
}
