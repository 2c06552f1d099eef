//! Registry of typed kernels and the selector in front of it

use super::cell::{TypedBinary, TypedFold, TypedUnary};
use super::{ApplyKernel, EmultKernel, ReduceKernel, Selection};
use crate::dtype::{DType, Element, Ordered, Scalar, Type};
use crate::engine::{self, ApplyJob, EmultJob, ReduceJob};
use crate::matrix::Matrix;
use crate::ops::{BinaryOp, BinaryOpcode, BinaryScalar, Monoid, UnaryOp, UnaryOpcode, UnaryScalar, binary};
use crate::{dispatch_binary, dispatch_unary};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

impl<T: Element, O: BinaryScalar<T>> EmultKernel for TypedBinary<T, O> {
    fn run(&self, job: &EmultJob<'_>) -> Matrix {
        engine::execute_emult(job, self)
    }
}

impl<T: Element, O: UnaryScalar<T>> ApplyKernel for TypedUnary<T, O> {
    fn run(&self, job: &ApplyJob<'_>) -> Matrix {
        engine::execute_apply(job, self)
    }
}

/// Reduce kernel specialized for monoid operator `O` over `T`.
///
/// The identity and terminal come from the job's monoid, so one kernel
/// serves every monoid built on the same operator.
pub struct TypedMonoid<T, O>(PhantomData<fn() -> (T, O)>);

impl<T, O> TypedMonoid<T, O> {
    /// New kernel
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: Element, O: BinaryScalar<T, Z = T>> ReduceKernel for TypedMonoid<T, O> {
    fn run(&self, job: &ReduceJob<'_>) -> Scalar {
        engine::execute_fold(job, &TypedFold::<T, O>::new(job.monoid()))
    }
}

/// Switches that force the generic path or refuse an operator outright
#[derive(Clone, Debug, Default)]
pub struct KernelConfig {
    disabled: HashSet<BinaryOpcode>,
    disabled_unary: HashSet<UnaryOpcode>,
    disabled_types: HashSet<DType>,
    unsupported: HashSet<BinaryOpcode>,
    unsupported_unary: HashSet<UnaryOpcode>,
    force_generic: bool,
}

impl KernelConfig {
    /// Never use a specialization for `opcode`
    pub fn disable(mut self, opcode: BinaryOpcode) -> Self {
        self.disabled.insert(opcode);
        self
    }

    /// Never use a specialization for the unary `opcode`
    pub fn disable_unary(mut self, opcode: UnaryOpcode) -> Self {
        self.disabled_unary.insert(opcode);
        self
    }

    /// Never use a specialization over `dtype`
    pub fn disable_type(mut self, dtype: DType) -> Self {
        self.disabled_types.insert(dtype);
        self
    }

    /// Refuse `opcode` with `NotImplemented`
    pub fn mark_unsupported(mut self, opcode: BinaryOpcode) -> Self {
        self.unsupported.insert(opcode);
        self
    }

    /// Refuse the unary `opcode` with `NotImplemented`
    pub fn mark_unsupported_unary(mut self, opcode: UnaryOpcode) -> Self {
        self.unsupported_unary.insert(opcode);
        self
    }

    /// Use the generic path for everything
    pub fn force_generic(mut self, on: bool) -> Self {
        self.force_generic = on;
        self
    }

    /// Returns true if every operation takes the generic path
    pub fn is_force_generic(&self) -> bool {
        self.force_generic
    }

    /// Returns true if `opcode` is refused
    pub fn is_unsupported(&self, opcode: BinaryOpcode) -> bool {
        self.unsupported.contains(&opcode)
    }

    /// Returns true if the unary `opcode` is refused
    pub fn is_unary_unsupported(&self, opcode: UnaryOpcode) -> bool {
        self.unsupported_unary.contains(&opcode)
    }

    fn blocks_types(&self, types: &[&Type]) -> bool {
        types
            .iter()
            .any(|t| t.builtin().is_some_and(|d| self.disabled_types.contains(&d)))
    }
}

/// Read-only table of typed kernels keyed by `(opcode, dtype)`
pub struct KernelRegistry {
    emult: HashMap<(BinaryOpcode, DType), Arc<dyn EmultKernel>>,
    apply: HashMap<(UnaryOpcode, DType), Arc<dyn ApplyKernel>>,
    reduce: HashMap<(BinaryOpcode, DType), Arc<dyn ReduceKernel>>,
}

static GLOBAL: OnceLock<Arc<KernelRegistry>> = OnceLock::new();

fn insert_reduce<T: Element, O: BinaryScalar<T, Z = T>>(
    map: &mut HashMap<(BinaryOpcode, DType), Arc<dyn ReduceKernel>>,
    opcode: BinaryOpcode,
) {
    map.insert((opcode, T::DTYPE), Arc::new(TypedMonoid::<T, O>::new()));
}

fn ordered_reduce<T: Ordered>(map: &mut HashMap<(BinaryOpcode, DType), Arc<dyn ReduceKernel>>) {
    insert_reduce::<T, binary::Plus>(map, BinaryOpcode::Plus);
    insert_reduce::<T, binary::Times>(map, BinaryOpcode::Times);
    insert_reduce::<T, binary::Min>(map, BinaryOpcode::Min);
    insert_reduce::<T, binary::Max>(map, BinaryOpcode::Max);
    insert_reduce::<T, binary::AnyOp>(map, BinaryOpcode::Any);
    insert_reduce::<T, binary::Lor>(map, BinaryOpcode::Lor);
    insert_reduce::<T, binary::Land>(map, BinaryOpcode::Land);
    insert_reduce::<T, binary::Lxor>(map, BinaryOpcode::Lxor);
}

fn complex_reduce<T: Element>(map: &mut HashMap<(BinaryOpcode, DType), Arc<dyn ReduceKernel>>) {
    insert_reduce::<T, binary::Plus>(map, BinaryOpcode::Plus);
    insert_reduce::<T, binary::Times>(map, BinaryOpcode::Times);
    insert_reduce::<T, binary::AnyOp>(map, BinaryOpcode::Any);
}

impl KernelRegistry {
    /// Registry with no specializations; everything runs generic
    pub fn empty() -> Self {
        Self {
            emult: HashMap::new(),
            apply: HashMap::new(),
            reduce: HashMap::new(),
        }
    }

    /// Registry holding a typed kernel for every built-in opcode over every
    /// built-in type it is defined for
    pub fn builtin() -> Self {
        let mut emult: HashMap<_, Arc<dyn EmultKernel>> = HashMap::new();
        let mut apply: HashMap<_, Arc<dyn ApplyKernel>> = HashMap::new();
        let mut reduce = HashMap::new();

        for &dtype in DType::ALL.iter() {
            for &opcode in BinaryOpcode::BUILTIN.iter() {
                let kernel = dispatch_binary!(opcode, dtype, T, O => {
                    Arc::new(TypedBinary::<T, O>::new()) as Arc<dyn EmultKernel>
                });
                if let Some(kernel) = kernel {
                    emult.insert((opcode, dtype), kernel);
                }
            }
            for opcode in [
                UnaryOpcode::Identity,
                UnaryOpcode::Ainv,
                UnaryOpcode::Minv,
                UnaryOpcode::Abs,
                UnaryOpcode::Lnot,
                UnaryOpcode::One,
            ] {
                let kernel = dispatch_unary!(opcode, dtype, T, O => {
                    Arc::new(TypedUnary::<T, O>::new()) as Arc<dyn ApplyKernel>
                });
                if let Some(kernel) = kernel {
                    apply.insert((opcode, dtype), kernel);
                }
            }
        }

        ordered_reduce::<bool>(&mut reduce);
        insert_reduce::<bool, binary::EqOp>(&mut reduce, BinaryOpcode::Eq);
        ordered_reduce::<i8>(&mut reduce);
        ordered_reduce::<i16>(&mut reduce);
        ordered_reduce::<i32>(&mut reduce);
        ordered_reduce::<i64>(&mut reduce);
        ordered_reduce::<u8>(&mut reduce);
        ordered_reduce::<u16>(&mut reduce);
        ordered_reduce::<u32>(&mut reduce);
        ordered_reduce::<u64>(&mut reduce);
        ordered_reduce::<f32>(&mut reduce);
        ordered_reduce::<f64>(&mut reduce);
        complex_reduce::<crate::dtype::Complex64>(&mut reduce);
        complex_reduce::<crate::dtype::Complex128>(&mut reduce);

        Self { emult, apply, reduce }
    }

    /// Process-wide built-in registry, populated on first use
    pub fn global() -> Arc<Self> {
        GLOBAL.get_or_init(|| Arc::new(Self::builtin())).clone()
    }

    /// Returns true if a typed emult kernel exists for `(opcode, dtype)`
    pub fn has_emult(&self, opcode: BinaryOpcode, dtype: DType) -> bool {
        self.emult.contains_key(&(opcode, dtype))
    }

    /// Returns true if a typed apply kernel exists for `(opcode, dtype)`
    pub fn has_apply(&self, opcode: UnaryOpcode, dtype: DType) -> bool {
        self.apply.contains_key(&(opcode, dtype))
    }

    /// Returns true if a typed reduce kernel exists for `(opcode, dtype)`
    pub fn has_reduce(&self, opcode: BinaryOpcode, dtype: DType) -> bool {
        self.reduce.contains_key(&(opcode, dtype))
    }

    /// Kernel for `z = op(a, b)` with operands of `atype`, `btype` and a
    /// result of `ctype`.
    ///
    /// A typed kernel is only chosen when no cast is needed anywhere.
    pub fn select_emult(
        &self,
        config: &KernelConfig,
        op: &BinaryOp,
        atype: &Type,
        btype: &Type,
        ctype: &Type,
    ) -> Selection<dyn EmultKernel> {
        let opcode = op.opcode();
        if config.is_unsupported(opcode) {
            return Selection::Unsupported;
        }
        let Some(dtype) = op.builtin_dtype() else {
            return Selection::Generic;
        };
        if config.force_generic
            || config.disabled.contains(&opcode)
            || config.blocks_types(&[op.xtype(), op.ztype()])
            || atype != op.xtype()
            || btype != op.ytype()
            || ctype != op.ztype()
        {
            return Selection::Generic;
        }
        match self.emult.get(&(opcode, dtype)) {
            Some(k) => Selection::Specialized(k.clone()),
            None => Selection::Generic,
        }
    }

    /// Kernel for `z = op(a)` with an operand of `atype` and a result of
    /// `ctype`
    pub fn select_apply(
        &self,
        config: &KernelConfig,
        op: &UnaryOp,
        atype: &Type,
        ctype: &Type,
    ) -> Selection<dyn ApplyKernel> {
        let opcode = op.opcode();
        if config.is_unary_unsupported(opcode) {
            return Selection::Unsupported;
        }
        let dtype = match op.xtype().builtin() {
            Some(d) if op.is_builtin() => d,
            _ => return Selection::Generic,
        };
        if config.force_generic
            || config.disabled_unary.contains(&opcode)
            || config.blocks_types(&[op.xtype()])
            || atype != op.xtype()
            || ctype != op.ztype()
        {
            return Selection::Generic;
        }
        match self.apply.get(&(opcode, dtype)) {
            Some(k) => Selection::Specialized(k.clone()),
            None => Selection::Generic,
        }
    }

    /// Kernel reducing values of `atype` with `monoid`
    pub fn select_reduce(
        &self,
        config: &KernelConfig,
        monoid: &Monoid,
        atype: &Type,
    ) -> Selection<dyn ReduceKernel> {
        let opcode = monoid.opcode();
        if config.is_unsupported(opcode) {
            return Selection::Unsupported;
        }
        let dtype = match monoid.ty().builtin() {
            Some(d) if monoid.is_builtin() => d,
            _ => return Selection::Generic,
        };
        if config.force_generic
            || config.disabled.contains(&opcode)
            || config.blocks_types(&[monoid.ty()])
            || atype != monoid.ty()
        {
            return Selection::Generic;
        }
        match self.reduce.get(&(opcode, dtype)) {
            Some(k) => Selection::Specialized(k.clone()),
            None => Selection::Generic,
        }
    }
}

impl Default for KernelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for KernelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelRegistry")
            .field("emult", &self.emult.len())
            .field("apply", &self.apply.len())
            .field("reduce", &self.reduce.len())
            .finish()
    }
}
