//! The N-D data payload attached to a cube.
//!
//! A payload is a handle to a shared array: cloning is cheap and the underlying buffer may
//! still be owned by the loader that produced it. The engine only ever inspects shape and
//! dtype, stacks along a new leading axis, joins along an existing axis, and reshapes; it
//! never reads data values.

use ndarray::{ArcArray, Axis, IxDyn};
use paste::paste;

use crate::errors::{Error, Result};

/// The numeric kind of a payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dtype {
    I32,
    I64,
    F32,
    F64,
}

#[derive(Clone, Debug)]
pub enum Payload {
    I32(ArcArray<i32, IxDyn>),
    I64(ArcArray<i64, IxDyn>),
    F32(ArcArray<f32, IxDyn>),
    F64(ArcArray<f64, IxDyn>),
}

macro_rules! payload_impl {
    ($($type:ident),*) => {
        paste! {
            impl Payload {
                $(
                    pub fn [<new_ $type:lower>](data: ArcArray<[<$type:lower>], IxDyn>) -> Self {
                        Payload::$type(data)
                    }
                )*

                pub fn dtype(&self) -> Dtype {
                    match self {
                        $(Payload::$type(_) => Dtype::$type,)*
                    }
                }

                pub fn shape(&self) -> &[usize] {
                    match self {
                        $(Payload::$type(data) => data.shape(),)*
                    }
                }

                pub fn ndim(&self) -> usize {
                    match self {
                        $(Payload::$type(data) => data.ndim(),)*
                    }
                }

                /// Stack payloads along a new leading axis. All parts must share dtype and
                /// shape; a mismatch here means the grouping logic let incompatible cubes
                /// through, which is an internal inconsistency.
                pub fn stack_new_axis(parts: &[Payload]) -> Result<Payload> {
                    match parts.first() {
                        None => Err(Error::EmptyInput {
                            what: "payloads to stack".to_string(),
                        }),
                        $(
                            Some(Payload::$type(_)) => {
                                let mut views = Vec::with_capacity(parts.len());
                                for part in parts {
                                    match part {
                                        Payload::$type(data) => views.push(data.view()),
                                        other => return Err(Error::DtypeMismatch {
                                            detail: format!(
                                                "cannot stack {:?} payload with {:?}",
                                                Dtype::$type,
                                                other.dtype(),
                                            ),
                                        }),
                                    }
                                }
                                let stacked = ndarray::stack(Axis(0), &views)
                                    .map_err(|err| Error::ShapeMismatch {
                                        detail: err.to_string(),
                                    })?;
                                Ok(Payload::$type(stacked.into_shared()))
                            }
                        )*
                    }
                }

                /// Join payloads along an existing axis. Parts must share dtype and agree on
                /// every other axis.
                pub fn concat_axis(axis: usize, parts: &[Payload]) -> Result<Payload> {
                    match parts.first() {
                        None => Err(Error::EmptyInput {
                            what: "payloads to concatenate".to_string(),
                        }),
                        $(
                            Some(Payload::$type(_)) => {
                                let mut views = Vec::with_capacity(parts.len());
                                for part in parts {
                                    match part {
                                        Payload::$type(data) => views.push(data.view()),
                                        other => return Err(Error::DtypeMismatch {
                                            detail: format!(
                                                "cannot concatenate {:?} payload with {:?}",
                                                Dtype::$type,
                                                other.dtype(),
                                            ),
                                        }),
                                    }
                                }
                                let joined = ndarray::concatenate(Axis(axis), &views)
                                    .map_err(|err| Error::ShapeMismatch {
                                        detail: err.to_string(),
                                    })?;
                                Ok(Payload::$type(joined.into_shared()))
                            }
                        )*
                    }
                }

                /// Reinterpret the payload with a new shape of the same element count.
                pub fn reshape(self, shape: Vec<usize>) -> Result<Payload> {
                    match self {
                        $(
                            Payload::$type(data) => {
                                let reshaped = data.into_shape(shape)
                                    .map_err(|err| Error::ShapeMismatch {
                                        detail: err.to_string(),
                                    })?;
                                Ok(Payload::$type(reshaped))
                            }
                        )*
                    }
                }
            }

            impl PartialEq for Payload {
                fn eq(&self, other: &Self) -> bool {
                    match (self, other) {
                        $((Payload::$type(a), Payload::$type(b)) => a == b,)*
                        _ => false,
                    }
                }
            }
        }
    };
}

payload_impl!(I32, I64, F32, F64);

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::array;

    fn payload_2x2(fill: f64) -> Payload {
        Payload::new_f64(array![[fill, fill + 1.0], [fill + 2.0, fill + 3.0]].into_dyn().into_shared())
    }

    #[test]
    fn test_shape_and_dtype() {
        let payload = payload_2x2(0.0);
        assert_eq!(payload.shape(), &[2, 2]);
        assert_eq!(payload.ndim(), 2);
        assert_eq!(payload.dtype(), Dtype::F64);
    }

    #[test]
    fn test_stack_new_axis() {
        let stacked = Payload::stack_new_axis(&[payload_2x2(0.0), payload_2x2(10.0)]).unwrap();
        assert_eq!(stacked.shape(), &[2, 2, 2]);
        match stacked {
            Payload::F64(data) => {
                assert_eq!(data[[0, 0, 0]], 0.0);
                assert_eq!(data[[1, 1, 1]], 13.0);
            }
            _ => panic!("expected F64 payload"),
        }
    }

    #[test]
    fn test_stack_dtype_mismatch() {
        let ints = Payload::new_i64(array![[1, 2], [3, 4]].into_dyn().into_shared());
        assert!(Payload::stack_new_axis(&[payload_2x2(0.0), ints]).is_err());
    }

    #[test]
    fn test_concat_axis() {
        let a = Payload::new_i64(array![[1, 2], [3, 4]].into_dyn().into_shared());
        let b = Payload::new_i64(array![[5, 6]].into_dyn().into_shared());
        let joined = Payload::concat_axis(0, &[a, b]).unwrap();
        assert_eq!(joined.shape(), &[3, 2]);

        let a = Payload::new_i64(array![[1, 2], [3, 4]].into_dyn().into_shared());
        let b = Payload::new_i64(array![[5], [6]].into_dyn().into_shared());
        let joined = Payload::concat_axis(1, &[a, b]).unwrap();
        assert_eq!(joined.shape(), &[2, 3]);
    }

    #[test]
    fn test_concat_shape_mismatch() {
        let a = Payload::new_i64(array![[1, 2], [3, 4]].into_dyn().into_shared());
        let b = Payload::new_i64(array![[5], [6]].into_dyn().into_shared());
        assert!(Payload::concat_axis(0, &[a, b]).is_err());
    }

    #[test]
    fn test_reshape() {
        let stacked = Payload::stack_new_axis(&[
            payload_2x2(0.0),
            payload_2x2(1.0),
            payload_2x2(2.0),
            payload_2x2(3.0),
        ])
        .unwrap();
        let reshaped = stacked.reshape(vec![2, 2, 2, 2]).unwrap();
        assert_eq!(reshaped.shape(), &[2, 2, 2, 2]);
        assert!(reshaped.reshape(vec![3, 5]).is_err());
    }

    #[test]
    fn test_shared_buffer() {
        let buffer = array![[1.0, 2.0], [3.0, 4.0]].into_dyn().into_shared();
        let a = Payload::new_f64(buffer.clone());
        let b = Payload::new_f64(buffer);
        assert_eq!(a, b);
    }
}
