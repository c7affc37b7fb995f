//! The instruction table.
//!
//! Each entry binds a case-insensitive mnemonic to an [`Operation`] and
//! declares its parameter list. Trailing parameters may carry a
//! [`Fallback`] used when the program line omits them:
//! - [`Fallback::Accumulator`] binds the accumulator
//! - [`Fallback::SameAs`] re-binds an earlier parameter (typically the
//!   source doubling as destination)

use std::collections::HashMap;
use serde::{Serialize, Deserialize};
use crate::machine::operand::Operand;
use crate::machine::state::Slot;

/// Every operation the machine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    // ==================== Data Transfer ====================

    /// dest := src
    Load,
    /// dest := accumulator
    Store,
    /// loc := 0
    Clear,

    // ==================== Arithmetic ====================

    /// dest := a + b
    Add,
    /// dest := a * b
    Multiply,
    /// a := a + 1
    Increment,
    /// a := a - 1
    Decrement,

    // ==================== Control Flow ====================

    /// if result > 0 then counter := dest
    BranchPositive,
    /// if result < 0 then counter := dest
    BranchNegative,
    /// if result = 0 then counter := dest
    BranchZero,
    /// if result != 0 then counter := dest
    BranchNonZero,

    // ==================== Logic ====================

    /// dest := complement of the 8-bit projection of src
    Not,
    /// dest := a AND b over the wider natural width
    And,

    // ==================== Shift / Rotate ====================

    /// Logical left shift (also serves the arithmetic left shift).
    ShiftLeft,
    /// Logical right shift.
    ShiftRight,
    /// Arithmetic right shift.
    ArithmeticShiftRight,
    /// Circular left rotation.
    RotateLeft,
    /// Circular right rotation.
    RotateRight,
    /// Left rotation through carry.
    RotateLeftCarry,
    /// Right rotation through carry.
    RotateRightCarry,
}

/// How an omitted parameter is filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fallback {
    /// Bind the accumulator.
    Accumulator,
    /// Bind whatever the parameter at this index was bound to.
    SameAs(usize),
}

/// One declared parameter of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: &'static str,
    pub doc: &'static str,
    pub fallback: Option<Fallback>,
}

const fn required(name: &'static str, doc: &'static str) -> Param {
    Param { name, doc, fallback: None }
}

const fn defaulted(name: &'static str, doc: &'static str, fallback: Fallback) -> Param {
    Param { name, doc, fallback: Some(fallback) }
}

/// A table entry: mnemonic, operation, parameters and documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OpSpec {
    pub mnemonic: &'static str,
    pub operation: Operation,
    pub params: &'static [Param],
    pub description: &'static str,
    pub examples: &'static [&'static str],
}

impl OpSpec {
    /// Number of parameters without a fallback.
    pub fn required_count(&self) -> usize {
        self.params.iter().filter(|p| p.fallback.is_none()).count()
    }

    /// Total number of declared parameters.
    pub fn max_count(&self) -> usize {
        self.params.len()
    }

    /// Whether `supplied` operands satisfy the arity contract.
    pub fn accepts(&self, supplied: usize) -> bool {
        supplied >= self.required_count() && supplied <= self.max_count()
    }

    /// Fill omitted trailing parameters from their fallbacks.
    ///
    /// The caller must have checked [`OpSpec::accepts`].
    pub fn bind(&self, mut operands: Vec<Operand>) -> Vec<Operand> {
        for param in &self.params[operands.len().min(self.params.len())..] {
            let bound = match param.fallback {
                Some(Fallback::Accumulator) | None => Operand::Slot(Slot::Accumulator),
                Some(Fallback::SameAs(index)) => operands[index].clone(),
            };
            operands.push(bound);
        }
        operands
    }

    /// Usage line, e.g. `Add a, b, dest`.
    pub fn usage(&self) -> String {
        let names: Vec<&str> = self.params.iter().map(|p| p.name).collect();
        if names.is_empty() {
            self.mnemonic.to_string()
        } else {
            format!("{} {}", self.mnemonic, names.join(", "))
        }
    }
}

// ============================================================================
// Table contents
// ============================================================================

const SHIFT_PARAMS: &[Param] = &[
    required("num", "The number of bits to shift"),
    required("val", "The value to shift"),
    defaulted("dest", "The destination to save the result to (default = val)", Fallback::SameAs(1)),
];

const ROTATE_PARAMS: &[Param] = &[
    required("num", "Number of bits to rotate"),
    required("val", "The value to rotate"),
    defaulted("dest", "The destination to save the result to (default = val)", Fallback::SameAs(1)),
];

const BRANCH_PARAMS: &[Param] = &[
    required("dest", "The line to jump to (lines are numbered from 0, each line number increasing by the word size)"),
];

const BINARY_PARAMS: &[Param] = &[
    required("a", "The first value"),
    defaulted("b", "The second value (default = accumulator)", Fallback::Accumulator),
    defaulted("dest", "The destination (default = b)", Fallback::SameAs(1)),
];

/// The standard instruction set, in definition order.
pub const OPERATIONS: &[OpSpec] = &[
    OpSpec {
        mnemonic: "Load",
        operation: Operation::Load,
        params: &[
            required("src", "The source of the data"),
            defaulted("dest", "The destination to load the data into (default = accumulator)", Fallback::Accumulator),
        ],
        description: "Loads the source data into the destination.",
        examples: &[
            "Load 44 ;Loads the value of memory slot 44 into the accumulator",
            "Load #45, R1 ;Loads the decimal number into register R1",
        ],
    },
    OpSpec {
        mnemonic: "Add",
        operation: Operation::Add,
        params: BINARY_PARAMS,
        description: "Adds a and b and stores the result in the destination.",
        examples: &[
            "Add R1, 25 ;Add the value of R1 to the value of memory slot 25 and store it in the same memory slot",
            "Add #4 ;Add 4 to the value of the accumulator",
        ],
    },
    OpSpec {
        mnemonic: "Store",
        operation: Operation::Store,
        params: &[required("dest", "The destination")],
        description: "Sets the value of the destination to the value of the accumulator.",
        examples: &[
            "Clear ;Clear the accumulator\nAdd #4 ;Add 4 to the accumulator\nAdd #5 ;Add 5 to the accumulator\nStore R1 ;R1 now contains 9",
        ],
    },
    OpSpec {
        mnemonic: "Decrement",
        operation: Operation::Decrement,
        params: &[defaulted("a", "The value to decrement (default = accumulator)", Fallback::Accumulator)],
        description: "Decrease the given value by one.",
        examples: &["Load #15 ;Set the value of the accumulator to 15\nDecrement ;Accumulator is now 14"],
    },
    OpSpec {
        mnemonic: "Increment",
        operation: Operation::Increment,
        params: &[defaulted("a", "The value to increment (default = accumulator)", Fallback::Accumulator)],
        description: "Increase the given value by one.",
        examples: &["Load #4, R1 ;Set R1 to 4\nIncrement R1 ;R1 is now 5"],
    },
    OpSpec {
        mnemonic: "Branch>0",
        operation: Operation::BranchPositive,
        params: BRANCH_PARAMS,
        description: "If the value of the last operation is greater than 0, jump the program execution to the given line.",
        examples: &[
            "Load #13, R2 ;Set result to 13\nLoad #4, R1 ;Set the number of loops\nAdd #3, R2 ;Add 3 to the result\nDecrement R1 ;Count the loop down\nBranch>0 #8 ;Jump to the \"Add ...\" line while R1 is greater than 0\nLoad R2, 123 ;Memory slot 123 now contains 25 (13 + 3 * 4)",
        ],
    },
    OpSpec {
        mnemonic: "Branch<0",
        operation: Operation::BranchNegative,
        params: BRANCH_PARAMS,
        description: "If the value of the last operation is less than 0, jump the program execution to the given line.",
        examples: &[],
    },
    OpSpec {
        mnemonic: "Branch=0",
        operation: Operation::BranchZero,
        params: BRANCH_PARAMS,
        description: "If the value of the last operation is equal to 0, jump the program execution to the given line.",
        examples: &[],
    },
    OpSpec {
        mnemonic: "Branch!=0",
        operation: Operation::BranchNonZero,
        params: BRANCH_PARAMS,
        description: "If the value of the last operation is not equal to 0, jump the program execution to the given line.",
        examples: &[],
    },
    OpSpec {
        mnemonic: "Clear",
        operation: Operation::Clear,
        params: &[defaulted("loc", "The value to clear (default = accumulator)", Fallback::Accumulator)],
        description: "Clears the given value.",
        examples: &[
            "Clear (R1) ;Clear the memory slot pointed to by R1",
            "Clear ;Clear the accumulator",
        ],
    },
    OpSpec {
        mnemonic: "Not",
        operation: Operation::Not,
        params: &[
            required("src", "The source value"),
            defaulted("dest", "The destination (default = src)", Fallback::SameAs(0)),
        ],
        description: "Performs the logical NOT operation on the 8-bit binary representation of the given value and stores it in the destination.",
        examples: &[
            "Load #%1010, R1 ;Load binary 1010 into R1\nNot R1 ;R1 now contains 11110101",
            "Load #%1100, R1 ;Load binary 1100 into R1\nNot R1, R2 ;R2 now contains 11110011",
        ],
    },
    OpSpec {
        mnemonic: "And",
        operation: Operation::And,
        params: BINARY_PARAMS,
        description: "Performs the logical AND operation on the binary representation of the given values and stores it in the destination.",
        examples: &["Load #%1001, R1 ;Load binary 1001 into R1\nAnd #%1100, R1 ;R1 now contains binary 1000"],
    },
    OpSpec {
        mnemonic: "LshiftL",
        operation: Operation::ShiftLeft,
        params: SHIFT_PARAMS,
        description: "Performs the logical left shift on the binary representation of the given value.",
        examples: &[],
    },
    OpSpec {
        mnemonic: "LshiftR",
        operation: Operation::ShiftRight,
        params: SHIFT_PARAMS,
        description: "Performs the logical right shift on the binary representation of the given value.",
        examples: &[],
    },
    OpSpec {
        mnemonic: "AshiftR",
        operation: Operation::ArithmeticShiftRight,
        params: SHIFT_PARAMS,
        description: "Performs the arithmetic right shift on the binary representation of the given value.",
        examples: &[],
    },
    OpSpec {
        mnemonic: "AshiftL",
        operation: Operation::ShiftLeft,
        params: SHIFT_PARAMS,
        description: "Performs the arithmetic left shift on the binary representation of the given value (identical to LshiftL).",
        examples: &[],
    },
    OpSpec {
        mnemonic: "RotateL",
        operation: Operation::RotateLeft,
        params: ROTATE_PARAMS,
        description: "Rotates the binary representation of the given value to the left.",
        examples: &[],
    },
    OpSpec {
        mnemonic: "RotateR",
        operation: Operation::RotateRight,
        params: ROTATE_PARAMS,
        description: "Rotates the binary representation of the given value to the right.",
        examples: &[],
    },
    OpSpec {
        mnemonic: "RotateLC",
        operation: Operation::RotateLeftCarry,
        params: ROTATE_PARAMS,
        description: "Rotates the binary representation of the given value to the left taking into account the carry bit.",
        examples: &[],
    },
    OpSpec {
        mnemonic: "RotateRC",
        operation: Operation::RotateRightCarry,
        params: ROTATE_PARAMS,
        description: "Rotates the binary representation of the given value to the right taking into account the carry bit.",
        examples: &[],
    },
    OpSpec {
        mnemonic: "Multiply",
        operation: Operation::Multiply,
        params: BINARY_PARAMS,
        description: "Multiplies two values and stores the result in the destination value.",
        examples: &[],
    },
];

/// Case-insensitive mnemonic lookup over a set of [`OpSpec`]s.
#[derive(Debug, Clone)]
pub struct InstructionTable {
    entries: &'static [OpSpec],
    by_name: HashMap<String, usize>,
}

impl InstructionTable {
    /// Build a table, checking the parameter contracts of every entry.
    ///
    /// # Panics
    /// Panics if two entries share a mnemonic, a required parameter follows
    /// a defaulted one, or a fallback refers to itself or a later parameter.
    pub fn new(entries: &'static [OpSpec]) -> Self {
        let mut by_name = HashMap::with_capacity(entries.len());
        for (index, spec) in entries.iter().enumerate() {
            let key = spec.mnemonic.to_lowercase();
            assert!(
                by_name.insert(key, index).is_none(),
                "duplicate mnemonic {}", spec.mnemonic
            );

            let mut seen_default = false;
            for (pos, param) in spec.params.iter().enumerate() {
                match param.fallback {
                    None => assert!(
                        !seen_default,
                        "{}: required parameter {} follows a defaulted one",
                        spec.mnemonic, param.name
                    ),
                    Some(fallback) => {
                        seen_default = true;
                        if let Fallback::SameAs(target) = fallback {
                            assert!(
                                target < pos,
                                "{}: parameter {} falls back to itself or a later parameter",
                                spec.mnemonic, param.name
                            );
                        }
                    }
                }
            }
        }
        Self { entries, by_name }
    }

    /// The standard instruction set.
    pub fn standard() -> Self {
        Self::new(OPERATIONS)
    }

    /// Look up a mnemonic, ignoring case.
    pub fn lookup(&self, mnemonic: &str) -> Option<&'static OpSpec> {
        let entries = self.entries;
        self.by_name
            .get(&mnemonic.to_lowercase())
            .map(|&index| &entries[index])
    }

    /// All entries in definition order.
    pub fn entries(&self) -> &'static [OpSpec] {
        self.entries
    }

    /// All entries sorted by mnemonic.
    pub fn sorted(&self) -> Vec<&'static OpSpec> {
        let mut sorted: Vec<_> = self.entries.iter().collect();
        sorted.sort_by_key(|spec| spec.mnemonic);
        sorted
    }
}

impl Default for InstructionTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::Word;

    #[test]
    fn test_standard_table_builds() {
        let table = InstructionTable::standard();
        assert_eq!(table.entries().len(), 21);
    }

    #[test]
    fn test_lookup_case_insensitive() {
        let table = InstructionTable::standard();
        assert_eq!(table.lookup("LOAD").unwrap().operation, Operation::Load);
        assert_eq!(table.lookup("lshiftr").unwrap().operation, Operation::ShiftRight);
        assert_eq!(table.lookup("branch!=0").unwrap().operation, Operation::BranchNonZero);
        assert!(table.lookup("foo").is_none());
    }

    #[test]
    fn test_ashiftl_aliases_shift_left() {
        let table = InstructionTable::standard();
        assert_eq!(table.lookup("AshiftL").unwrap().operation, Operation::ShiftLeft);
        assert_eq!(table.lookup("LshiftL").unwrap().operation, Operation::ShiftLeft);
    }

    #[test]
    fn test_arity() {
        let table = InstructionTable::standard();
        let store = table.lookup("store").unwrap();
        assert!(!store.accepts(0));
        assert!(store.accepts(1));
        assert!(!store.accepts(2));

        let add = table.lookup("add").unwrap();
        assert_eq!((add.required_count(), add.max_count()), (1, 3));

        let clear = table.lookup("clear").unwrap();
        assert!(clear.accepts(0));
    }

    #[test]
    fn test_bind_defaults() {
        let table = InstructionTable::standard();
        let imm = Operand::Immediate(Word::new(4));
        let r1 = Operand::Slot(Slot::Register("R1".into()));
        let acc = Operand::Slot(Slot::Accumulator);

        // Add #4 -> (#4, ACC, ACC)
        let bound = table.lookup("add").unwrap().bind(vec![imm.clone()]);
        assert_eq!(bound, vec![imm.clone(), acc.clone(), acc.clone()]);

        // Add #4, R1 -> (#4, R1, R1)
        let bound = table.lookup("add").unwrap().bind(vec![imm.clone(), r1.clone()]);
        assert_eq!(bound, vec![imm.clone(), r1.clone(), r1.clone()]);

        // Not R1 -> (R1, R1)
        let bound = table.lookup("not").unwrap().bind(vec![r1.clone()]);
        assert_eq!(bound, vec![r1.clone(), r1.clone()]);

        // Clear -> (ACC)
        let bound = table.lookup("clear").unwrap().bind(vec![]);
        assert_eq!(bound, vec![acc]);
    }

    #[test]
    fn test_usage() {
        let table = InstructionTable::standard();
        assert_eq!(table.lookup("add").unwrap().usage(), "Add a, b, dest");
        assert_eq!(table.lookup("rotatelc").unwrap().usage(), "RotateLC num, val, dest");
    }

    #[test]
    #[should_panic(expected = "falls back to itself")]
    fn test_forward_fallback_rejected() {
        static BAD: &[OpSpec] = &[OpSpec {
            mnemonic: "Bad",
            operation: Operation::Load,
            params: &[defaulted("x", "", Fallback::SameAs(0))],
            description: "",
            examples: &[],
        }];
        InstructionTable::new(BAD);
    }

    #[test]
    #[should_panic(expected = "duplicate mnemonic")]
    fn test_duplicate_mnemonic_rejected() {
        static DUP: &[OpSpec] = &[
            OpSpec { mnemonic: "Load", operation: Operation::Load, params: &[], description: "", examples: &[] },
            OpSpec { mnemonic: "LOAD", operation: Operation::Load, params: &[], description: "", examples: &[] },
        ];
        InstructionTable::new(DUP);
    }
}
