use snapsql_core::Position;

/// One instruction in the linear virtual-machine program.
///
/// Every variant carries the position of the source construct it was
/// lowered from, for diagnostics and source maps.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "op", rename_all = "snake_case"))]
pub enum Instruction {
    /// Append literal text.
    EmitStatic {
        /// The literal text to append.
        value: String,
        /// Source position.
        pos: Position,
    },
    /// Append a bind placeholder; bind a parameter-map lookup by name.
    EmitParam {
        /// The parameter name to look up.
        name: String,
        /// Source position.
        pos: Position,
    },
    /// Append a bind placeholder; bind an evaluated expression.
    EmitEval {
        /// Index into the expression table.
        expr_index: usize,
        /// Source position.
        pos: Position,
    },
    /// Provisionally append text; dropped at the next `Boundary` unless a
    /// static emission has occurred since the previous one.
    EmitUnlessBoundary {
        /// The connector text (e.g. `"AND "`, `", "`).
        value: String,
        /// Source position.
        pos: Position,
    },
    /// Resolve any pending `EmitUnlessBoundary` instructions.
    Boundary {
        /// Source position.
        pos: Position,
    },
    /// Push a condition frame (or replace the active one, for `elif`).
    If {
        /// Index into the expression table.
        expr_index: usize,
        /// Source position.
        pos: Position,
    },
    /// Replace the active condition frame with another branch's condition.
    ElseIf {
        /// Index into the expression table.
        expr_index: usize,
        /// Source position.
        pos: Position,
    },
    /// Flip the active condition frame.
    Else {
        /// Source position.
        pos: Position,
    },
    /// Pop the active condition frame.
    End {
        /// Source position.
        pos: Position,
    },
    /// Evaluate the collection and push loop state, binding `var_name` to
    /// the first element, or jump to the matching `LoopEnd` if empty.
    LoopStart {
        /// The loop variable's name.
        var_name: String,
        /// Index into the expression table for the collection expression.
        expr_index: usize,
        /// Source position.
        pos: Position,
    },
    /// Advance the iterator, rebinding `var_name` and jumping back to the
    /// loop body, or unbinding it and falling through.
    LoopEnd {
        /// The loop variable's name.
        var_name: String,
        /// Source position.
        pos: Position,
    },
    /// Append a dialect-appropriate `LIMIT ?` and bind the runtime limit.
    EmitSystemLimit {
        /// Source position.
        pos: Position,
    },
    /// Append a dialect-appropriate `OFFSET ?` and bind the runtime offset.
    EmitSystemOffset {
        /// Source position.
        pos: Position,
    },
    /// Guard: true only if the system limit directive is enabled and set.
    IfSystemLimit {
        /// Source position.
        pos: Position,
    },
    /// Guard: true only if the system offset directive is enabled and set.
    IfSystemOffset {
        /// Source position.
        pos: Position,
    },
    /// Append a named system scalar (e.g. the resolved `EXPLAIN` prefix).
    EmitSystemValue {
        /// Which system value to append.
        key: String,
        /// Source position.
        pos: Position,
    },
    /// No operation.
    Nop {
        /// Source position.
        pos: Position,
    },
}

impl Instruction {
    /// The position this instruction was lowered from.
    pub fn pos(&self) -> Position {
        match self {
            Self::EmitStatic { pos, .. }
            | Self::EmitParam { pos, .. }
            | Self::EmitEval { pos, .. }
            | Self::EmitUnlessBoundary { pos, .. }
            | Self::Boundary { pos }
            | Self::If { pos, .. }
            | Self::ElseIf { pos, .. }
            | Self::Else { pos }
            | Self::End { pos }
            | Self::LoopStart { pos, .. }
            | Self::LoopEnd { pos, .. }
            | Self::EmitSystemLimit { pos }
            | Self::EmitSystemOffset { pos }
            | Self::IfSystemLimit { pos }
            | Self::IfSystemOffset { pos }
            | Self::EmitSystemValue { pos, .. }
            | Self::Nop { pos } => *pos,
        }
    }
}
