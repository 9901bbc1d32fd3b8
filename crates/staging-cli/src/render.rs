use staging_core::render_as_markdown;

use crate::action::ActionOutput;

pub const NO_CHANGES: &str = "No changes";
pub const BUILD_SUCCEEDED: &str = "Build succeded";

/// Turn an action's output into the text printed on stdout, if any.
pub fn render(output: &ActionOutput) -> Option<String> {
    match output {
        ActionOutput::Nothing => None,
        ActionOutput::Results(results) => Some(render_as_markdown(results)),
        ActionOutput::Commit(commit) => Some(
            commit
                .as_deref()
                .filter(|c| !c.is_empty())
                .unwrap_or(NO_CHANGES)
                .to_string(),
        ),
        ActionOutput::BuildSucceeded => Some(BUILD_SUCCEEDED.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::results;

    #[test]
    fn unit_output_prints_nothing() {
        assert_eq!(render(&ActionOutput::Nothing), None);
    }

    #[test]
    fn commit_is_printed_verbatim() {
        assert_eq!(
            render(&ActionOutput::Commit(Some("abc123".into()))).as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn missing_commit_prints_no_changes() {
        assert_eq!(
            render(&ActionOutput::Commit(None)).as_deref(),
            Some("No changes")
        );
        assert_eq!(
            render(&ActionOutput::Commit(Some(String::new()))).as_deref(),
            Some("No changes")
        );
    }

    #[test]
    fn results_are_rendered_as_markdown() {
        let set = results(true);
        assert_eq!(
            render(&ActionOutput::Results(set.clone())),
            Some(render_as_markdown(&set))
        );
    }

    #[test]
    fn build_success_literal() {
        assert_eq!(
            render(&ActionOutput::BuildSucceeded).as_deref(),
            Some("Build succeded")
        );
    }
}
