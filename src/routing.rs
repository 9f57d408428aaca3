//! Intent routing: decide per query whether to answer from retrieved
//! document context or from conversation alone, then dispatch.
//!
//! Classification is a two-way tagged decision behind the pluggable
//! [`RouteClassifier`] trait, so the default LLM-backed classifier can be
//! swapped for a rule-based one without touching dispatch. The router holds
//! no per-query state: every call classifies, dispatches, and returns.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::category::CategoryFilter;
use crate::generation::Generator;
use crate::retrieval::{RetrievedContext, Retriever};
use crate::session::{Session, SourceRef};
use crate::types::EngineError;

/// Identifier token of the document-grounded responder, as presented to the
/// classifier model.
pub const GROUNDED_RESPONDER: &str = "policy_agent";
/// Identifier token of the general conversational responder.
pub const GENERAL_RESPONDER: &str = "chat_agent";

/// Fixed reply when the grounded route finds no context at all. Returned
/// without invoking the generation service.
pub const NO_CONTEXT_MESSAGE: &str = "I don't have enough information to answer that yet. \
     Please upload the relevant policy documents first.";

/// The two dispatch targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Grounded,
    General,
}

impl Route {
    /// Classifies a free-text routing decision by case-insensitive substring
    /// match. Anything mentioning policies, HR, or the grounded responder's
    /// identifier goes to the grounded route; everything else is general
    /// conversation.
    pub fn from_decision(decision: &str) -> Self {
        let lowered = decision.to_lowercase();
        if lowered.contains("policies")
            || lowered.contains("hr")
            || lowered.contains(GROUNDED_RESPONDER)
        {
            Route::Grounded
        } else {
            Route::General
        }
    }
}

/// Produces a [`Route`] for an incoming query.
#[async_trait]
pub trait RouteClassifier: Send + Sync {
    async fn classify(&self, query: &str) -> Result<Route, EngineError>;
}

/// Default classifier: one best-effort LLM call against a fixed instruction
/// template. No confidence threshold, no re-ask on ambiguous output.
pub struct LlmClassifier {
    generator: Arc<dyn Generator>,
}

impl LlmClassifier {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    fn instruction_prompt(query: &str) -> String {
        format!(
            "You route questions for a workplace assistant. Two responders are available:\n\
             - {GROUNDED_RESPONDER}: answers questions about company policies, HR topics, \
             and uploaded policy documents.\n\
             - {GENERAL_RESPONDER}: handles greetings and general conversation, with no \
             document lookup.\n\n\
             Reply with the name of the single responder best suited to the question below.\n\n\
             Question: {query}"
        )
    }
}

#[async_trait]
impl RouteClassifier for LlmClassifier {
    async fn classify(&self, query: &str) -> Result<Route, EngineError> {
        let decision = self
            .generator
            .generate(&Self::instruction_prompt(query))
            .await?;
        let route = Route::from_decision(&decision);
        debug!(?route, decision = decision.trim(), "classified query");
        Ok(route)
    }
}

/// A routed answer: the response text, which route produced it, and the
/// chunks it was grounded on (empty for the general route).
#[derive(Clone, Debug)]
pub struct RoutedAnswer {
    pub text: String,
    pub route: Route,
    pub sources: Vec<SourceRef>,
}

/// Answers document questions from retrieved context.
pub struct GroundedResponder {
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    retrieval_limit: usize,
}

impl GroundedResponder {
    pub const DEFAULT_RETRIEVAL_LIMIT: usize = 3;

    pub fn new(retriever: Retriever, generator: Arc<dyn Generator>) -> Self {
        Self {
            retriever,
            generator,
            retrieval_limit: Self::DEFAULT_RETRIEVAL_LIMIT,
        }
    }

    #[must_use]
    pub fn with_retrieval_limit(mut self, limit: usize) -> Self {
        self.retrieval_limit = limit.max(1);
        self
    }

    fn build_prompt(contexts: &[RetrievedContext], session: &Session, query: &str) -> String {
        let mut prompt = String::from(
            "Using only the following context, answer the question. If you don't know the \
             answer based on the context, say you don't have enough information.\n\nContext:\n",
        );
        for context in contexts {
            prompt.push_str(&format!(
                "Source: {}, Page: {}, Category: {}, Last updated: {}\n{}\n\n",
                context.source, context.page, context.category, context.last_updated, context.text
            ));
        }
        if !session.grounded_history().is_empty() {
            prompt.push_str("Conversation so far:\n");
            prompt.push_str(&session.grounded_history().transcript());
            prompt.push('\n');
        }
        prompt.push_str(&format!("Question: {query}"));
        prompt
    }

    /// Retrieves context and answers. On an empty retrieval the fixed
    /// [`NO_CONTEXT_MESSAGE`] comes back without a generation call. A failed
    /// generation leaves the history untouched.
    pub async fn respond(
        &self,
        session: &mut Session,
        query: &str,
        filter: CategoryFilter,
    ) -> Result<RoutedAnswer, EngineError> {
        let contexts = self
            .retriever
            .query(query, filter, self.retrieval_limit)
            .await?;

        if contexts.is_empty() {
            session.record_grounded(query, NO_CONTEXT_MESSAGE);
            session.set_last_sources(Vec::new());
            return Ok(RoutedAnswer {
                text: NO_CONTEXT_MESSAGE.to_string(),
                route: Route::Grounded,
                sources: Vec::new(),
            });
        }

        let prompt = Self::build_prompt(&contexts, session, query);
        let text = self.generator.generate(&prompt).await?;

        let sources: Vec<SourceRef> = contexts
            .iter()
            .map(|context| SourceRef {
                source: context.source.clone(),
                page: context.page,
            })
            .collect();
        session.record_grounded(query, &text);
        session.set_last_sources(sources.clone());
        Ok(RoutedAnswer {
            text,
            route: Route::Grounded,
            sources,
        })
    }
}

/// Answers from conversation history alone; no retrieval, no sources.
pub struct GeneralResponder {
    generator: Arc<dyn Generator>,
}

impl GeneralResponder {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    fn build_prompt(session: &Session, query: &str) -> String {
        let mut prompt =
            String::from("You are a friendly workplace assistant. Continue the conversation.\n\n");
        if !session.general_history().is_empty() {
            prompt.push_str("Conversation so far:\n");
            prompt.push_str(&session.general_history().transcript());
            prompt.push('\n');
        }
        prompt.push_str(&format!("User: {query}"));
        prompt
    }

    pub async fn respond(
        &self,
        session: &mut Session,
        query: &str,
    ) -> Result<RoutedAnswer, EngineError> {
        let prompt = Self::build_prompt(session, query);
        let text = self.generator.generate(&prompt).await?;
        session.record_general(query, &text);
        Ok(RoutedAnswer {
            text,
            route: Route::General,
            sources: Vec::new(),
        })
    }
}

/// Classifies each query and dispatches it to the matching responder.
pub struct Router {
    classifier: Arc<dyn RouteClassifier>,
    grounded: GroundedResponder,
    general: GeneralResponder,
}

impl Router {
    pub fn new(
        classifier: Arc<dyn RouteClassifier>,
        grounded: GroundedResponder,
        general: GeneralResponder,
    ) -> Self {
        Self {
            classifier,
            grounded,
            general,
        }
    }

    /// Routes a query with no category constraint.
    pub async fn route(
        &self,
        session: &mut Session,
        query: &str,
    ) -> Result<RoutedAnswer, EngineError> {
        self.route_in_category(session, query, CategoryFilter::All)
            .await
    }

    /// Routes a query, constraining any grounded retrieval to `filter`.
    pub async fn route_in_category(
        &self,
        session: &mut Session,
        query: &str,
        filter: CategoryFilter,
    ) -> Result<RoutedAnswer, EngineError> {
        match self.classifier.classify(query).await? {
            Route::Grounded => self.grounded.respond(session, query, filter).await,
            Route::General => self.general.respond(session, query).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_text_with_policy_cues_routes_grounded() {
        assert_eq!(Route::from_decision("policy_agent"), Route::Grounded);
        assert_eq!(
            Route::from_decision("This is an HR question."),
            Route::Grounded
        );
        assert_eq!(
            Route::from_decision("Ask the one that knows about policies"),
            Route::Grounded
        );
    }

    #[test]
    fn plain_decisions_route_general() {
        assert_eq!(Route::from_decision("chat_agent"), Route::General);
        assert_eq!(
            Route::from_decision("just a greeting, use small talk"),
            Route::General
        );
    }
}
