use serde::{Deserialize, Serialize};

/// Defines session phases and which of them accept player input
pub trait Phase: Copy + Clone + PartialEq + Send + Sync + std::fmt::Debug + Default {
    fn allows_input(&self) -> bool;
    fn is_terminal(&self) -> bool;
    fn next(&self) -> Option<Self>;

    fn is_intro(&self) -> bool {
        false
    }
    fn is_scored(&self) -> bool {
        false
    }
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    #[default]
    Intro,
    Presenting,
    AwaitingInput,
    Scored,
    Complete,
}

impl Phase for GamePhase {
    fn allows_input(&self) -> bool {
        matches!(self, Self::AwaitingInput)
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Successor within a trial loop. `Scored` loops back to `Presenting`;
    /// the session decides when it goes to `Complete` instead.
    fn next(&self) -> Option<Self> {
        use GamePhase::*;
        Some(match self {
            Intro => Presenting,
            Presenting => AwaitingInput,
            AwaitingInput => Scored,
            Scored => Presenting,
            Complete => return None,
        })
    }

    fn is_intro(&self) -> bool {
        matches!(self, Self::Intro)
    }

    fn is_scored(&self) -> bool {
        matches!(self, Self::Scored)
    }
}
