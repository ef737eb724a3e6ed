pub mod decision;
pub mod policy;

pub use decision::{
    AccessContext, AccessStatus, DeniedField, Operation, ReadDecision, RowDecision, RowOperation,
    Verdict, WriteDecision, WriteValidation,
};
pub use policy::{
    builtin_mask, Mask, MaskFn, ReadPolicyTier, SensitivePolicy, TierStatus, WritePolicy,
    DEFAULT_MASK,
};
