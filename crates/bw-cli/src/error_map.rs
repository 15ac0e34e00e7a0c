use std::fmt::Write as _;

pub(crate) fn emit_error(error: anyhow::Error) -> i32 {
    let message = serde_json::to_string(&describe(&error))
        .unwrap_or_else(|_| "\"Unknown error\"".to_string());
    println!("RESULT:ERROR");
    println!("ERROR_MSG_JSON:{}", message);
    1
}

/// The error and its causes on one line.
pub(crate) fn describe(error: &anyhow::Error) -> String {
    let mut out = error.to_string();
    for cause in error.chain().skip(1) {
        let _ = write!(out, ": {}", cause);
    }
    out
}

#[cfg(test)]
mod error_map_tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn emit_error_returns_non_zero_exit_code() {
        assert_eq!(emit_error(anyhow::anyhow!("failed")), 1);
    }

    #[test]
    fn describe_joins_the_cause_chain() {
        let error = Err::<(), _>(std::io::Error::other("disk full"))
            .context("Failed to write checkpoint")
            .expect_err("error");
        assert_eq!(describe(&error), "Failed to write checkpoint: disk full");
    }
}
