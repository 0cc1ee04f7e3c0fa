//! Ownership checks for component interactions.
//!
//! Buttons are visible to everyone in the channel, so commands that act on a
//! user's resources carry that user's id in a fixed argument slot and only
//! that user may press them.

use crate::commands::ComponentCommand;

/// Who a command may be pressed by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Subject<'a> {
    Anyone,
    Owner(&'a str),
    /// `cancel`: the proposing owner cancels, the counterpart declines.
    Dialog { owner: Option<&'a str>, counterpart: Option<&'a str> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny,
    Cancel,
    Decline,
}

impl ComponentCommand {
    pub fn subject(&self) -> Subject<'_> {
        match self {
            Self::Gacha { user_id, .. }
            | Self::Pull { user_id, .. }
            | Self::Buy { user_id, .. }
            | Self::Now { user_id }
            | Self::Give { user_id, .. }
            | Self::Synthesis { user_id, .. }
            | Self::Steal { user_id, .. }
            | Self::Install { user_id, .. }
            | Self::Uninstall { user_id, .. }
            | Self::Stats { user_id, .. } => Subject::Owner(user_id),
            // the counterpart accepts a trade, not the proposer
            Self::Trade { target_id, .. } => Subject::Owner(target_id),
            Self::Cancel { owner, counterpart } => {
                Subject::Dialog { owner: owner.as_deref(), counterpart: counterpart.as_deref() }
            }
            Self::Media { .. }
            | Self::Character { .. }
            | Self::MediaCharacters { .. }
            | Self::List { .. }
            | Self::Like { .. }
            | Self::Likes { .. }
            | Self::Found { .. }
            | Self::Help { .. }
            | Self::Packs { .. }
            | Self::Popular { .. } => Subject::Anyone,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PermissionGuard;

impl PermissionGuard {
    pub fn check(&self, command: &ComponentCommand, invoker: &str) -> Verdict {
        match command.subject() {
            Subject::Anyone => Verdict::Allow,
            Subject::Owner(owner) if owner == invoker => Verdict::Allow,
            Subject::Owner(_) => Verdict::Deny,
            Subject::Dialog { owner: None, counterpart: None } => Verdict::Cancel,
            Subject::Dialog { owner: Some(owner), .. } if owner == invoker => Verdict::Cancel,
            Subject::Dialog { counterpart: Some(counterpart), .. } if counterpart == invoker => {
                Verdict::Decline
            }
            Subject::Dialog { .. } => Verdict::Deny,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PermissionGuard, Verdict};
    use crate::commands::ComponentCommand;

    fn check(identifier: &str, invoker: &str) -> Verdict {
        let command = ComponentCommand::parse(identifier).expect("parse");
        PermissionGuard.check(&command, invoker)
    }

    #[test]
    fn owned_commands_admit_only_the_owner() {
        assert_eq!(check("gacha=user_id", "user_id"), Verdict::Allow);
        assert_eq!(check("gacha=user_id", "another_user_id"), Verdict::Deny);
        assert_eq!(check("buy=normal=user_id=3", "user_id"), Verdict::Allow);
        assert_eq!(check("buy=normal=user_id=3", "normal"), Verdict::Deny);
        assert_eq!(check("stats=str=user_id=character_id", "str"), Verdict::Deny);
        assert_eq!(check("install=pack_id=user_id", "pack_id"), Verdict::Deny);
    }

    #[test]
    fn trade_is_accepted_by_the_counterpart() {
        assert_eq!(check("trade=user_id=target_id=g1=t1", "target_id"), Verdict::Allow);
        assert_eq!(check("trade=user_id=target_id=g1=t1", "user_id"), Verdict::Deny);
    }

    #[test]
    fn browsing_commands_are_open() {
        assert_eq!(check("media=media_id", "anyone"), Verdict::Allow);
        assert_eq!(check("list=user_id===1", "someone_else"), Verdict::Allow);
        assert_eq!(check("help==1", "anyone"), Verdict::Allow);
    }

    #[test]
    fn cancel_dialog_rules() {
        assert_eq!(check("cancel", "anyone"), Verdict::Cancel);
        assert_eq!(check("cancel=user_id", "user_id"), Verdict::Cancel);
        assert_eq!(check("cancel=user_id", "target_id"), Verdict::Deny);
        assert_eq!(check("cancel=user_id=target_id", "user_id"), Verdict::Cancel);
        assert_eq!(check("cancel=user_id=target_id", "target_id"), Verdict::Decline);
        assert_eq!(check("cancel=user_id=target_id", "bystander"), Verdict::Deny);
        assert_eq!(check("cancel==target_id", "target_id"), Verdict::Decline);
        assert_eq!(check("cancel==target_id", "bystander"), Verdict::Deny);
    }
}
