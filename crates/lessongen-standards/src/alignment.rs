//! Alignment filtering of candidate standard codes
//!
//! Asks an injected judgment service which crosswalk-equivalent codes are
//! actually relevant to a generated item. Filtering is a quality
//! improvement, never a gate: a judge failure returns the candidates
//! unchanged, and a reply naming no candidate falls back to one code per
//! represented framework so no framework is silently dropped.

use crate::error::StandardsError;
use crate::framework::Framework;
use async_trait::async_trait;
use std::collections::HashSet;

/// Embedded in the judgment prompt when no context passage is configured
pub const NO_PASSAGE_SENTINEL: &str = "(no passage provided)";

/// External judgment capability. Pure transport; this module never calls
/// the network directly.
#[async_trait]
pub trait StandardsJudge: Send + Sync {
    /// Submit a judgment prompt, returning the judge's free-text reply
    async fn judge(&self, prompt: &str, model: &str) -> Result<String, StandardsError>;
}

/// Candidate codes judged relevant to `generated`, in candidate order.
///
/// The judge's free-text reply is parsed by exact-substring presence of
/// each candidate code.
pub async fn filter_aligned(
    generated: &str,
    context: &str,
    candidates: &[String],
    judge: &dyn StandardsJudge,
    model: &str,
) -> Vec<String> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let prompt = judgment_prompt(generated, context, candidates);
    let reply = match judge.judge(&prompt, model).await {
        Ok(reply) => reply,
        Err(err) => {
            // Fail open: a transport failure must not block generation
            tracing::warn!(%err, "alignment judge failed; keeping all candidates");
            return candidates.to_vec();
        }
    };

    let kept: Vec<String> = candidates
        .iter()
        .filter(|code| reply.contains(code.as_str()))
        .cloned()
        .collect();
    if !kept.is_empty() {
        return kept;
    }

    tracing::debug!("judge named no candidates; falling back to one per framework");
    one_per_framework(candidates)
}

/// First candidate seen for each represented framework
fn one_per_framework(candidates: &[String]) -> Vec<String> {
    let mut seen: HashSet<Option<Framework>> = HashSet::new();
    candidates
        .iter()
        .filter(|code| seen.insert(Framework::of_code(code)))
        .cloned()
        .collect()
}

fn judgment_prompt(generated: &str, context: &str, candidates: &[String]) -> String {
    let passage = if context.trim().is_empty() {
        NO_PASSAGE_SENTINEL
    } else {
        context
    };
    format!(
        "You are reviewing educational standards alignment.\n\n\
         GENERATED CONTENT:\n{generated}\n\n\
         SOURCE PASSAGE:\n{passage}\n\n\
         CANDIDATE STANDARD CODES:\n{}\n\n\
         List only the candidate codes that are topically relevant to the \
         generated content, exactly as written above. If none are relevant, \
         say \"none\".",
        candidates.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedJudge(Result<String, ()>);

    #[async_trait]
    impl StandardsJudge for ScriptedJudge {
        async fn judge(&self, _prompt: &str, _model: &str) -> Result<String, StandardsError> {
            self.0
                .clone()
                .map_err(|()| StandardsError::JudgeFailed("scripted failure".to_string()))
        }
    }

    fn candidates() -> Vec<String> {
        vec![
            "CCSS.RL.9.1".to_string(),
            "CCSS.RL.9.2".to_string(),
            "TEKS.9.5.B".to_string(),
            "BLOOM.Analyze".to_string(),
        ]
    }

    #[tokio::test]
    async fn keeps_codes_named_in_reply() {
        let judge = ScriptedJudge(Ok(
            "Relevant: TEKS.9.5.B and CCSS.RL.9.2 match well.".to_string()
        ));
        let kept = filter_aligned("quiz question", "passage", &candidates(), &judge, "m").await;
        // Candidate order preserved, not reply order
        assert_eq!(kept, vec!["CCSS.RL.9.2", "TEKS.9.5.B"]);
    }

    #[tokio::test]
    async fn judge_error_fails_open() {
        let judge = ScriptedJudge(Err(()));
        let input = candidates();
        let kept = filter_aligned("quiz question", "", &input, &judge, "m").await;
        assert_eq!(kept, input);
    }

    #[tokio::test]
    async fn unparseable_reply_keeps_one_per_framework() {
        let judge = ScriptedJudge(Ok("nothing here is relevant".to_string()));
        let kept = filter_aligned("quiz question", "passage", &candidates(), &judge, "m").await;
        // First candidate of each represented framework
        assert_eq!(kept, vec!["CCSS.RL.9.1", "TEKS.9.5.B", "BLOOM.Analyze"]);
    }

    #[tokio::test]
    async fn empty_candidates_skip_the_judge() {
        struct PanicJudge;
        #[async_trait]
        impl StandardsJudge for PanicJudge {
            async fn judge(&self, _p: &str, _m: &str) -> Result<String, StandardsError> {
                panic!("judge must not be called");
            }
        }
        let kept = filter_aligned("text", "", &[], &PanicJudge, "m").await;
        assert!(kept.is_empty());
    }

    #[test]
    fn prompt_uses_sentinel_for_blank_passage() {
        let prompt = judgment_prompt("g", "  ", &candidates());
        assert!(prompt.contains(NO_PASSAGE_SENTINEL));
        let prompt = judgment_prompt("g", "real passage", &candidates());
        assert!(prompt.contains("real passage"));
        assert!(!prompt.contains(NO_PASSAGE_SENTINEL));
    }
}
