//! Linearized, self-contained form of a subgraph.

use smallvec::SmallVec;
use tessera_value::Category;

use crate::op::Op;

/// One lowered instruction. `args` are addresses of earlier instructions.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub op: Op,
    pub args: SmallVec<[u32; 4]>,
}

/// Instructions in dependency order: every argument address is smaller than
/// the address of the instruction using it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    pub root: u32,
}

impl Program {
    pub(crate) fn push(&mut self, instruction: Instruction) -> u32 {
        self.instructions.push(instruction);
        (self.instructions.len() - 1) as u32
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instruction(&self, address: u32) -> Option<&Instruction> {
        self.instructions.get(address as usize)
    }

    pub fn root_instruction(&self) -> Option<&Instruction> {
        self.instruction(self.root)
    }

    /// Output category of the root instruction.
    pub fn category(&self) -> Option<Category> {
        self.root_instruction().map(|i| i.op.category())
    }
}
