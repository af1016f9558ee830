//! Branch predicates.

/// Comparison evaluated by a conditional jump on `(dst, operand)`.
///
/// `Gt`/`Ge`/`Lt`/`Le` compare as unsigned 64-bit values; the `S*` variants
/// compare as signed. `Eq`, `Ne` and `Set` do not depend on signedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BranchOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Set,
    Sgt,
    Sge,
    Slt,
    Sle,
}

impl BranchOp {
    /// Evaluates the predicate.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn taken(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Gt => (lhs as u64) > (rhs as u64),
            Self::Ge => (lhs as u64) >= (rhs as u64),
            Self::Lt => (lhs as u64) < (rhs as u64),
            Self::Le => (lhs as u64) <= (rhs as u64),
            Self::Set => lhs & rhs != 0,
            Self::Sgt => lhs > rhs,
            Self::Sge => lhs >= rhs,
            Self::Slt => lhs < rhs,
            Self::Sle => lhs <= rhs,
        }
    }
}
