use crate::validate::{is_valid_name, is_valid_serial, normalize_phone};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Track {
    Purchase,
    Activation,
}

/// Position of a user inside an intake track. Variants are declared in the
/// order the activation track walks through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntakeState {
    AwaitingPhone,
    AwaitingName,
    AwaitingSerial,
    AwaitingSerialPhoto,
    AwaitingBoxSerial,
    AwaitingBoxSerialPhoto,
    AwaitingKit,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    /// Photo or document.
    File,
    /// The skip button of an optional photo step.
    Skip,
}

/// Value captured by a step, together with how raw input is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Phone,
    Name,
    Serial,
    SerialPhoto,
    BoxSerial,
    BoxSerialPhoto,
    Kit,
}

impl Field {
    /// Returns the value to store, or `None` when the input is rejected.
    pub fn validate(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        match self {
            Field::Phone => normalize_phone(raw),
            Field::Name => is_valid_name(raw).then(|| trimmed.to_string()),
            Field::Serial | Field::BoxSerial => is_valid_serial(raw).then(|| trimmed.to_string()),
            Field::SerialPhoto | Field::BoxSerialPhoto | Field::Kit => {
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    /// `None` for skips: the step advances without storing anything.
    pub capture: Option<Field>,
    pub next: IntakeState,
}

const fn capture(field: Field, next: IntakeState) -> Option<Rule> {
    Some(Rule {
        capture: Some(field),
        next,
    })
}

const fn skip(next: IntakeState) -> Option<Rule> {
    Some(Rule {
        capture: None,
        next,
    })
}

/// Transition table of both tracks. `None` means the input kind is not
/// accepted in that state and the user is re-prompted.
pub fn rule(track: Track, state: IntakeState, input: InputKind) -> Option<Rule> {
    use InputKind::*;
    use IntakeState::*;

    match (track, state, input) {
        (_, AwaitingPhone, Text) => capture(Field::Phone, AwaitingName),

        (Track::Purchase, AwaitingName, Text) => capture(Field::Name, Done),
        (Track::Activation, AwaitingName, Text) => capture(Field::Name, AwaitingSerial),

        (Track::Activation, AwaitingSerial, Text) => capture(Field::Serial, AwaitingSerialPhoto),
        (Track::Activation, AwaitingSerialPhoto, File) => {
            capture(Field::SerialPhoto, AwaitingBoxSerial)
        }
        (Track::Activation, AwaitingSerialPhoto, Skip) => skip(AwaitingBoxSerial),
        (Track::Activation, AwaitingBoxSerial, Text) => {
            capture(Field::BoxSerial, AwaitingBoxSerialPhoto)
        }
        (Track::Activation, AwaitingBoxSerialPhoto, File) => capture(Field::BoxSerialPhoto, Done),
        (Track::Activation, AwaitingBoxSerialPhoto, Skip) => skip(Done),

        (Track::Activation, AwaitingKit, Text) => capture(Field::Kit, Done),

        _ => None,
    }
}

/// Input kind a state waits for, used when re-prompting.
pub fn expected_input(state: IntakeState) -> Option<InputKind> {
    match state {
        IntakeState::AwaitingSerialPhoto | IntakeState::AwaitingBoxSerialPhoto => {
            Some(InputKind::File)
        }
        IntakeState::Done => None,
        _ => Some(InputKind::Text),
    }
}
