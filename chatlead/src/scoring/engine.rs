use std::sync::Arc;

use super::rules::RuleTable;
use crate::models::{Message, ScoreDelta};
use crate::processing::normalize_text;

/// Presence-based keyword scoring over the client side of a conversation.
///
/// Every rule that matches at least once contributes exactly one delta, in
/// table order. The engine holds no mutable state.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    rules: Arc<RuleTable>,
}

impl ScoringEngine {
    pub fn new(rules: Arc<RuleTable>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Score persisted messages. Business-side messages are ignored.
    pub fn score_conversation(&self, messages: &[Message]) -> Vec<ScoreDelta> {
        self.score_client_texts(messages.iter().filter(|m| !m.from_me).map(|m| m.text.as_str()))
    }

    /// Score texts already known to be client-authored.
    pub fn score_client_texts<I, S>(&self, texts: I) -> Vec<ScoreDelta>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let blob = texts
            .into_iter()
            .map(|t| normalize_text(t.as_ref()))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if blob.is_empty() {
            return Vec::new();
        }

        self.rules
            .rules()
            .iter()
            .filter(|rule| rule.matches(&blob))
            .map(|rule| ScoreDelta::rule(rule.delta, rule.reason.clone()))
            .collect()
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(Arc::new(RuleTable::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageKind, ScoreOrigin};
    use crate::scoring::ScoringRule;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn message(text: &str, from_me: bool) -> Message {
        Message {
            id: 0,
            chat_id: 1,
            contact_id: 1,
            kind: MessageKind::Text,
            text: text.to_string(),
            author_raw: if from_me { "Ventas" } else { "Juan" }.to_string(),
            from_me,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_commercial_query() {
        let engine = ScoringEngine::default();
        let events = engine.score_client_texts(["cuanto sale el plan"]);
        assert_eq!(events, vec![ScoreDelta::rule(2, "Consulta comercial")]);
        assert_eq!(events[0].origin, ScoreOrigin::Rule);
    }

    #[test]
    fn test_rejection_fires() {
        let engine = ScoringEngine::default();
        let events = engine.score_client_texts(["no me interesa, cancelar"]);
        assert!(events.contains(&ScoreDelta::rule(-8, "Rechazo definitivo")));
    }

    #[test]
    fn test_presence_not_occurrence() {
        let engine = ScoringEngine::default();
        let events = engine.score_client_texts(["precio?", "y el precio del plan?", "precio precio"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].delta, 2);
    }

    #[test]
    fn test_business_messages_ignored() {
        let engine = ScoringEngine::default();
        let messages = vec![
            message("Tenemos fibra optica en tu zona, cuanto queres?", true),
            message("hola", false),
        ];
        assert!(engine.score_conversation(&messages).is_empty());
    }

    #[test]
    fn test_events_follow_table_order() {
        let engine = ScoringEngine::default();
        let events = engine.score_client_texts(["hay fibra en mi barrio?", "cual es el precio"]);
        let reasons: Vec<_> = events.iter().map(|e| e.reason.as_str()).collect();
        assert_eq!(
            reasons,
            vec!["Consulta comercial", "Interés técnico", "Consulta de cobertura"]
        );
    }

    #[test]
    fn test_substitute_rule_table() {
        let table = RuleTable::new(vec![ScoringRule::new(["demo"], 5, "Pidió demo")]);
        let engine = ScoringEngine::new(Arc::new(table));
        assert_eq!(
            engine.score_client_texts(["quiero una DEMO"]),
            vec![ScoreDelta::rule(5, "Pidió demo")]
        );
        assert!(engine.score_client_texts(["demostracion"]).is_empty());
        assert!(engine.score_client_texts(Vec::<String>::new()).is_empty());
    }
}
