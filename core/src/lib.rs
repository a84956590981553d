pub mod assignment;
pub mod capacity;
pub mod datetime;
pub mod participant;
pub mod payload;
pub mod picker;
pub mod reorder;
pub mod search;
pub mod slot;
pub mod steps;
pub mod store;
pub mod validation;

pub use assignment::{AssignError, Assignment, AssignmentBook, RegistrationMode, SlotStatus};
pub use capacity::{Capacity, CapacityError, CapacityUpdate};
pub use participant::{Participant, ParticipantKey, ParticipantKeyError};
pub use payload::{Registrant, RegistrationPayload, SeedAssignment, PAYLOAD_FIELD_NAME};
pub use picker::{picker_view, PickerChoice, PickerMemory, PickerView, SlotAction};
pub use reorder::{DropPlacement, ReorderKind, TimedItem};
pub use search::{plan_search, PanelMemory, SearchMode, SearchPlan, StationEntry};
pub use slot::{Slot, SlotAttributes, SlotKind};
pub use steps::{DuplicateCheckRequest, DuplicateCheckResponse, DuplicateOutcome, SignupStep, StepGate};
pub use store::{KeyValueStore, MemoryStore, PreferenceStore, SessionStore, StoreError};
pub use validation::{FieldIssue, FieldKind, FormField};
