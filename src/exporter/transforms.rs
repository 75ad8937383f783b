//! Scalar transform chains applied to a variable's column after it's
//! resolved from the raw map, in insertion (declaration) order. A thin
//! sequencer over `DataObject::multiply_by`/`offset_by`.

use crate::DataObject;
use crate::Error;

#[derive(Debug, Clone)]
pub enum Transform {
    Identity,
    Scale(f64),
    Offset(f64),
}

impl Transform {
    pub fn apply(&self, obj: &mut DataObject) -> Result<(), Error> {
        match self {
            Transform::Identity => Ok(()),
            Transform::Scale(factor) => obj.multiply_by(*factor),
            Transform::Offset(amount) => obj.offset_by(*amount),
        }
    }
}

/// Applies a chain in order, stopping (and propagating) on the first error.
pub fn apply_chain(chain: &[Transform], obj: &mut DataObject) -> Result<(), Error> {
    for transform in chain {
        transform.apply(obj)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_applies_in_order() {
        let mut obj = DataObject::from_f64("x".to_string(), vec![1], vec![10.0]);
        let chain = vec![Transform::Scale(2.0), Transform::Offset(1.0)];
        apply_chain(&chain, &mut obj).unwrap();
        if let DataObject::F64(c) = &obj {
            assert_eq!(c.data, vec![21.0]);
        } else {
            panic!("wrong variant");
        }
    }
}
