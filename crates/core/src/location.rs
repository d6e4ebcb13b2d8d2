//! Line-table rows and location lists.
//!
//! The engine never decodes these sections itself. A data source or a caller
//! hands them in as values and the pipeline carries, compares and explodes them.

use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineRecord {
    pub address: u64,
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for LineRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x} {}:{}", self.address, self.file, self.line)?;
        if self.column != 0 {
            write!(f, ":{}", self.column)?;
        }
        Ok(())
    }
}

/// One operation of a location expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocOp {
    pub offset: u64,
    pub opcode: u8,
    pub operands: Vec<u64>,
}

impl fmt::Display for LocOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}: DW_OP_{:#x}", self.offset, self.opcode)?;
        for operand in &self.operands {
            write!(f, " {operand}")?;
        }
        Ok(())
    }
}

/// An address range of a location list together with its expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoclistEntry {
    pub low: u64,
    pub high: u64,
    pub ops: Vec<LocOp>,
}

impl LoclistEntry {
    pub fn contains(&self, address: u64) -> bool {
        (self.low..self.high).contains(&address)
    }
}

impl fmt::Display for LoclistEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}..{:#x}:", self.low, self.high)?;
        for (i, op) in self.ops.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{op}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_print_their_expression() {
        let entry = LoclistEntry {
            low: 0x10,
            high: 0x20,
            ops: vec![
                LocOp { offset: 0, opcode: 0x91, operands: vec![8] },
                LocOp { offset: 2, opcode: 0x9f, operands: vec![] },
            ],
        };
        assert_eq!(entry.to_string(), "0x10..0x20: 0x0: DW_OP_0x91 8, 0x2: DW_OP_0x9f");
        assert!(entry.contains(0x1f));
        assert!(!entry.contains(0x20));
    }
}
