//! Booth intervention policy.

use crate::auth::SocketAuthPacket;

/// Whether the caller behind `packet` may stop a booth it does not hold.
///
/// Currently every authenticated interpreter may: relief interpreters and
/// moderators must be able to close out a booth whose holder dropped without
/// cleanup. A stricter rule (holder-only, role-gated) only needs to change
/// this function.
#[must_use]
pub fn may_stop_booth(_packet: &SocketAuthPacket) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::UserClaims;
    use cabine_core::SubjectId;

    #[test]
    fn any_interpreter_may_stop() {
        let packet = SocketAuthPacket {
            claims: UserClaims::for_subject(SubjectId::new("subj-1").unwrap()),
            email: "ada@example.org".to_string(),
            interpreter: None,
        };
        assert!(may_stop_booth(&packet));
    }
}
