//! Operation semantics.
//!
//! Every value-producing operation writes its destination and mirrors the
//! written value into the machine's `result` register. Branches only read
//! `result` and never write it.

use thiserror::Error;
use crate::machine::operand::Operand;
use crate::machine::state::Machine;
use crate::machine::table::Operation;
use crate::word::{bits, Word, DEFAULT_WIDTH};

/// Errors raised while carrying out an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpError {
    #[error("{op:?} expects {expected} bound operands, got {got}")]
    BadBinding { op: Operation, expected: usize, got: usize },
}

/// Execute `op` against fully bound operands.
///
/// `args` must already have had omitted parameters filled in from the
/// table's fallbacks; see [`crate::machine::table::OpSpec::bind`].
pub fn execute(op: Operation, args: &[Operand], machine: &mut Machine) -> Result<(), OpError> {
    let arg = |index: usize| {
        args.get(index).ok_or(OpError::BadBinding {
            op,
            expected: index + 1,
            got: args.len(),
        })
    };

    match op {
        // ==================== Data Transfer ====================

        Operation::Load => {
            let value = arg(0)?.value(machine);
            write_result(machine, arg(1)?, value);
        }

        Operation::Store => {
            let value = machine.accumulator.clone();
            write_result(machine, arg(0)?, value);
        }

        Operation::Clear => {
            write_result(machine, arg(0)?, Word::zero());
        }

        // ==================== Arithmetic ====================

        Operation::Add => {
            let a = arg(0)?.value(machine);
            let b = arg(1)?.value(machine);
            write_result(machine, arg(2)?, Word::new(a.value() + b.value()));
        }

        Operation::Multiply => {
            let a = arg(0)?.value(machine);
            let b = arg(1)?.value(machine);
            write_result(machine, arg(2)?, Word::new(a.value() * b.value()));
        }

        Operation::Increment => {
            let target = arg(0)?;
            let value = Word::new(target.value(machine).value() + 1u8);
            write_result(machine, target, value);
        }

        Operation::Decrement => {
            let target = arg(0)?;
            let value = Word::new(target.value(machine).value() - 1u8);
            write_result(machine, target, value);
        }

        // ==================== Control Flow ====================

        Operation::BranchPositive
        | Operation::BranchNegative
        | Operation::BranchZero
        | Operation::BranchNonZero => {
            let result = &machine.result;
            let taken = match op {
                Operation::BranchPositive => result.is_positive(),
                Operation::BranchNegative => result.is_negative(),
                Operation::BranchZero => result.is_zero(),
                _ => !result.is_zero(),
            };
            if taken {
                let target = arg(0)?.value(machine);
                machine.counter = target;
            }
        }

        // ==================== Logic ====================

        Operation::Not => {
            let src = arg(0)?.value(machine);
            write_result(machine, arg(1)?, bits::not(&src, DEFAULT_WIDTH));
        }

        Operation::And => {
            let a = arg(0)?.value(machine);
            let b = arg(1)?.value(machine);
            write_result(machine, arg(2)?, bits::and(&a, &b));
        }

        // ==================== Shift / Rotate ====================

        Operation::ShiftLeft
        | Operation::ShiftRight
        | Operation::ArithmeticShiftRight
        | Operation::RotateLeft
        | Operation::RotateRight => {
            let count = arg(0)?.value(machine);
            let val = arg(1)?.value(machine);
            let shifted = match op {
                Operation::ShiftLeft => bits::shift_left(&val, &count),
                Operation::ShiftRight => bits::shift_right(&val, &count),
                Operation::ArithmeticShiftRight => bits::arithmetic_shift_right(&val, &count),
                Operation::RotateLeft => bits::rotate_left(&val, &count),
                _ => bits::rotate_right(&val, &count),
            };
            write_result(machine, arg(2)?, shifted);
        }

        Operation::RotateLeftCarry | Operation::RotateRightCarry => {
            let count = arg(0)?.value(machine);
            let val = arg(1)?.value(machine);
            let (rotated, carry) = if op == Operation::RotateLeftCarry {
                bits::rotate_left_carry(&val, &count, machine.carry)
            } else {
                bits::rotate_right_carry(&val, &count, machine.carry)
            };
            machine.carry = carry;
            write_result(machine, arg(2)?, rotated);
        }
    }

    Ok(())
}

/// Store `value` in `dest` and mirror it into `result`.
fn write_result(machine: &mut Machine, dest: &Operand, value: Word) {
    dest.store(machine, value.clone());
    machine.result = value;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::config::MachineConfig;
    use crate::machine::state::Slot;
    use num_bigint::BigInt;
    use num_traits::One;

    fn machine() -> Machine {
        Machine::new(&MachineConfig::reference())
    }

    fn w(v: i128) -> Word {
        Word::new(v)
    }

    fn imm(v: impl Into<Word>) -> Operand {
        Operand::Immediate(v.into())
    }

    fn reg(name: &str) -> Operand {
        Operand::Slot(Slot::Register(name.to_string()))
    }

    fn acc() -> Operand {
        Operand::Slot(Slot::Accumulator)
    }

    fn value(m: &Machine, op: &Operand) -> Word {
        op.value(m)
    }

    #[test]
    fn test_load_sets_dest_and_result() {
        let mut m = machine();
        execute(Operation::Load, &[imm(1204), reg("R1")], &mut m).unwrap();
        assert_eq!(value(&m, &reg("R1")), w(1204));
        assert_eq!(m.result, w(1204));
    }

    #[test]
    fn test_store_copies_accumulator() {
        let mut m = machine();
        m.accumulator = w(9);
        execute(Operation::Store, &[reg("R2")], &mut m).unwrap();
        assert_eq!(value(&m, &reg("R2")), w(9));
        assert_eq!(m.result, w(9));
    }

    #[test]
    fn test_add_and_multiply() {
        let mut m = machine();
        execute(Operation::Add, &[imm(4), acc(), acc()], &mut m).unwrap();
        execute(Operation::Multiply, &[imm(3), acc(), reg("R5")], &mut m).unwrap();
        assert_eq!(m.accumulator, w(4));
        assert_eq!(value(&m, &reg("R5")), w(12));
        assert_eq!(m.result, w(12));
    }

    #[test]
    fn test_arithmetic_past_machine_integers() {
        let mut m = machine();
        execute(Operation::Add, &[imm(i128::MAX), imm(1), acc()], &mut m).unwrap();
        assert_eq!(m.accumulator.value(), &(BigInt::one() << 127u32));

        let two_64 = BigInt::one() << 64u32;
        execute(Operation::Multiply, &[imm(two_64.clone()), imm(two_64.clone()), reg("R5")], &mut m).unwrap();
        execute(Operation::Multiply, &[reg("R5"), imm(two_64), reg("R5")], &mut m).unwrap();
        assert_eq!(value(&m, &reg("R5")).value(), &(BigInt::one() << 192u32));
        assert_eq!(m.result.value(), &(BigInt::one() << 192u32));
    }

    #[test]
    fn test_increment_decrement() {
        let mut m = machine();
        execute(Operation::Increment, &[reg("R1")], &mut m).unwrap();
        assert_eq!(value(&m, &reg("R1")), w(247));
        execute(Operation::Decrement, &[acc()], &mut m).unwrap();
        assert_eq!(m.accumulator, w(-1));
        assert_eq!(m.result, w(-1));
    }

    #[test]
    fn test_clear_writes_zero_result() {
        let mut m = machine();
        m.result = w(5);
        execute(Operation::Clear, &[reg("R1")], &mut m).unwrap();
        assert!(value(&m, &reg("R1")).is_zero());
        assert!(m.result.is_zero());
    }

    #[test]
    fn test_branches_follow_result() {
        let cases = [
            (Operation::BranchPositive, 1, true),
            (Operation::BranchPositive, 0, false),
            (Operation::BranchNegative, -3, true),
            (Operation::BranchNegative, 3, false),
            (Operation::BranchZero, 0, true),
            (Operation::BranchZero, 2, false),
            (Operation::BranchNonZero, -1, true),
            (Operation::BranchNonZero, 0, false),
        ];
        for (op, result, taken) in cases {
            let mut m = machine();
            m.counter = w(4);
            m.result = w(result);
            execute(op, &[imm(40)], &mut m).unwrap();
            assert_eq!(m.counter == w(40), taken, "{op:?} with result {result}");
            // Branches never touch the result register
            assert_eq!(m.result, w(result));
        }
    }

    #[test]
    fn test_not_defaults_to_eight_bits() {
        let mut m = machine();
        // R1 = 0b11110110
        execute(Operation::Not, &[reg("R1"), reg("R1")], &mut m).unwrap();
        assert_eq!(value(&m, &reg("R1")), w(0b0000_1001));
        execute(Operation::Not, &[imm(0b1010), acc()], &mut m).unwrap();
        assert_eq!(m.accumulator, w(0b1111_0101));
    }

    #[test]
    fn test_and_uses_wider_width() {
        let mut m = machine();
        // R2 = 3240 keeps bits above the low byte
        execute(Operation::And, &[reg("R2"), imm(0xFFF), acc()], &mut m).unwrap();
        assert_eq!(m.accumulator, w(3240));
    }

    #[test]
    fn test_shift_into_other_dest() {
        let mut m = machine();
        execute(Operation::ShiftRight, &[imm(2), reg("R1"), acc()], &mut m).unwrap();
        assert_eq!(m.accumulator, w(0b0011_1101));
        assert_eq!(value(&m, &reg("R1")), w(0b1111_0110));

        execute(Operation::ArithmeticShiftRight, &[imm(2), reg("R1"), reg("R1")], &mut m).unwrap();
        assert_eq!(value(&m, &reg("R1")), w(0b1111_1101));
    }

    #[test]
    fn test_plain_rotates_leave_carry() {
        let mut m = machine();
        assert!(m.carry);
        execute(Operation::RotateLeft, &[imm(1), reg("R1"), reg("R1")], &mut m).unwrap();
        assert_eq!(value(&m, &reg("R1")), w(0b1110_1101));
        execute(Operation::RotateRight, &[imm(3), reg("R1"), reg("R1")], &mut m).unwrap();
        assert_eq!(value(&m, &reg("R1")), w(0b1011_1101));
        assert!(m.carry);
    }

    #[test]
    fn test_rotate_through_carry_chains() {
        let mut m = machine();
        m.carry = false;
        m.accumulator = w(0b1000_0000);

        execute(Operation::RotateLeftCarry, &[imm(1), acc(), acc()], &mut m).unwrap();
        assert!(m.accumulator.is_zero());
        assert!(m.carry);

        execute(Operation::RotateLeftCarry, &[imm(1), acc(), acc()], &mut m).unwrap();
        assert_eq!(m.accumulator, w(1));
        assert!(!m.carry);
    }

    #[test]
    fn test_rotate_right_carry_multi_step() {
        let mut m = machine();
        // carry = 1; 0b00000011 >> 2 through carry: 1 enters, then the first dropped 1
        m.accumulator = w(0b0000_0011);
        execute(Operation::RotateRightCarry, &[imm(2), acc(), acc()], &mut m).unwrap();
        assert_eq!(m.accumulator, w(0b1100_0000));
        assert!(m.carry);
    }

    #[test]
    fn test_immediate_destination_absorbs_write() {
        let mut m = machine();
        execute(Operation::Increment, &[imm(5)], &mut m).unwrap();
        assert_eq!(m.result, w(6));
        assert!(m.accumulator.is_zero());
    }

    #[test]
    fn test_unbound_operands_rejected() {
        let mut m = machine();
        let err = execute(Operation::Add, &[imm(1)], &mut m).unwrap_err();
        assert!(matches!(err, OpError::BadBinding { op: Operation::Add, .. }));
    }
}
