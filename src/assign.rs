//! Copying algebraic objects into one another.
//!
//! [`assign`] copies the data of a source object into an existing target object of the same
//! kind. Online objects additionally carry basis component bookkeeping (see
//! [`BasisComponents`]), which is propagated from the source to the target: a target without
//! bookkeeping adopts the source's, a target with bookkeeping must agree with the source.
use crate::error::RbError;
use crate::online::{BasisComponents, OnlineMatrix, OnlineSize, OnlineVector};
use crate::operand::{Operand, OperandMut};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Bookkeeping {
    /// Both sides must carry identical bookkeeping.
    Strict,
    /// Both sides must agree on the components they share.
    Compatible,
}

fn propagated(
    target: Option<&BasisComponents>,
    source: Option<&BasisComponents>,
    rule: Bookkeeping,
) -> Option<BasisComponents> {
    match (target, source) {
        (None, source) => source.cloned(),
        (Some(_), None) => panic!("Cannot assign an object without basis component bookkeeping to one that carries it."),
        (Some(target), Some(source)) => {
            match rule {
                Bookkeeping::Strict => assert_eq!(target, source, "Basis component bookkeeping must be identical."),
                Bookkeeping::Compatible => assert!(
                    target.is_compatible_with(source),
                    "Basis component bookkeeping must agree on shared components."
                ),
            }
            Some(target.clone())
        }
    }
}

fn propagate_vector(target: &mut OnlineVector, source: &OnlineVector, rule: Bookkeeping) {
    let components = propagated(target.components(), source.components(), rule);
    target.set_components(components);
}

fn propagate_matrix(target: &mut OnlineMatrix, source: &OnlineMatrix) {
    let (target_rows, target_cols) = target.components();
    let (source_rows, source_cols) = source.components();
    assert_eq!(
        target_rows.is_none(),
        target_cols.is_none(),
        "Basis component bookkeeping must be present on both axes or on none."
    );
    let components = (
        propagated(target_rows.as_ref(), source_rows.as_ref(), Bookkeeping::Strict),
        propagated(target_cols.as_ref(), source_cols.as_ref(), Bookkeeping::Strict),
    );
    target.set_components(components);
}

/// Copies `source` into `target`.
///
/// Supported pairs are objects of the same kind. Dimensions must match (a mismatch is a
/// programming error and panics), except for online functions of multi-component reduced spaces:
///
/// - if both are blocked, the blocks present in both are copied and must have the same size.
///   Blocks only present in the source are ignored, blocks only present in the target are left
///   untouched;
/// - a monolithic source can be assigned to a blocked target with exactly one block;
/// - a blocked source with exactly one block can be assigned to a monolithic target, which
///   becomes blocked.
///
/// Any other combination of monolithic and blocked sizes is refused with
/// [`RbError::InvalidValue`]. Operands of different kinds yield [`RbError::InvalidOperands`].
pub fn assign<'a, 'b>(target: impl Into<OperandMut<'a>>, source: impl Into<Operand<'b>>) -> Result<(), RbError> {
    match (target.into(), source.into()) {
        (OperandMut::Function(target), Operand::Function(source)) => {
            assert_eq!(
                target.space().dim(),
                source.space().dim(),
                "Functions must have the same number of degrees of freedom."
            );
            target.vector_mut().copy_from(source.vector());
            Ok(())
        }
        (OperandMut::OnlineFunction(target), Operand::OnlineFunction(source)) => {
            assign_online_function(target.vector_mut(), source.vector())
        }
        (OperandMut::OnlineVector(target), Operand::OnlineVector(source)) => {
            assert_eq!(target.size(), source.size(), "Online vectors must have the same size.");
            target.content_mut().copy_from(source.content());
            propagate_vector(target, source, Bookkeeping::Strict);
            Ok(())
        }
        (OperandMut::OnlineMatrix(target), Operand::OnlineMatrix(source)) => {
            assert_eq!(target.size(), source.size(), "Online matrices must have the same size.");
            target.content_mut().copy_from(source.content());
            propagate_matrix(target, source);
            Ok(())
        }
        (OperandMut::Vector(target), Operand::Vector(source)) => {
            assert_eq!(target.len(), source.len(), "Vectors must have the same length.");
            target.copy_from(source);
            Ok(())
        }
        (OperandMut::Matrix(target), Operand::Matrix(source)) => {
            assert_eq!(target.nrows(), source.nrows(), "Matrices must have the same number of rows.");
            assert_eq!(target.ncols(), source.ncols(), "Matrices must have the same number of columns.");
            *target = source.clone();
            Ok(())
        }
        (OperandMut::FunctionsList(target), Operand::FunctionsList(source)) => {
            target.clear();
            target.enrich(source);
            Ok(())
        }
        (target, source) => Err(RbError::InvalidOperands {
            target: target.kind(),
            operand: source.kind(),
        }),
    }
}

fn assign_online_function(target: &mut OnlineVector, source: &OnlineVector) -> Result<(), RbError> {
    match (target.size().clone(), source.size()) {
        (OnlineSize::Monolithic(n_target), OnlineSize::Monolithic(n_source)) => {
            assert_eq!(n_target, *n_source, "Online functions must have the same size.");
            target.content_mut().copy_from(source.content());
            propagate_vector(target, source, Bookkeeping::Strict);
        }
        (OnlineSize::Blocks(target_blocks), OnlineSize::Blocks(source_blocks)) => {
            for (name, n_source) in source_blocks {
                if let Some(n_target) = target_blocks.get(name) {
                    assert_eq!(n_target, n_source, "Component {name} must have the same size on both sides.");
                }
            }
            let target_ranges = target.size().block_ranges();
            let source_ranges = source.size().block_ranges();
            for (name, source_range) in &source_ranges {
                if let Some(target_range) = target_ranges.get(name) {
                    target
                        .content_mut()
                        .rows_mut(target_range.start, target_range.len())
                        .copy_from(&source.content().rows(source_range.start, source_range.len()));
                }
            }
            let same_components = target_blocks.len() == source_blocks.len()
                && target_blocks.keys().all(|name| source_blocks.contains_key(name));
            let rule = if same_components {
                Bookkeeping::Strict
            } else {
                Bookkeeping::Compatible
            };
            propagate_vector(target, source, rule);
        }
        (OnlineSize::Blocks(target_blocks), OnlineSize::Monolithic(n_source)) => {
            if target_blocks.len() != 1 {
                return Err(RbError::InvalidValue(
                    "Refusing to assign an int dimension N to a dict dimension N with more than one component".into(),
                ));
            }
            let (name, n_target) = target_blocks
                .first()
                .expect("Exactly one component is present");
            assert_eq!(n_target, n_source, "Component {name} must have the size of the source.");
            target.content_mut().copy_from(source.content());
            propagate_vector(target, source, Bookkeeping::Strict);
        }
        (OnlineSize::Monolithic(n_target), OnlineSize::Blocks(source_blocks)) => {
            if source_blocks.len() != 1 {
                return Err(RbError::InvalidValue(
                    "Refusing to assign a dict dimension N with more than one component to an int dimension N".into(),
                ));
            }
            let (name, n_source) = source_blocks
                .first()
                .expect("Exactly one component is present");
            assert_eq!(n_target, *n_source, "Component {name} must have the size of the target.");
            target.set_size(source.size().clone());
            target.content_mut().copy_from(source.content());
            propagate_vector(target, source, Bookkeeping::Strict);
        }
    }
    Ok(())
}
