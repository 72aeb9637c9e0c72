use core::{fmt::Debug, marker::PhantomData};

use crate::components::{
    AsG, BlockToETileMap, BsG, DsG, EG, FusedMatmulBlueprint, FusedMatmulInvalidProblem,
    FusedMatmulProblem, FusedMatmulSpec, OperandGroup, OperandIdent, check_buffer,
    check_layout_support, check_operations, check_vector_access,
    descriptor::{BlockDescriptors, ProblemDescriptors, TensorDescriptor},
    elementwise::ElementwiseOps,
};

use super::GridwiseFusedMatmul;

/// Read-only view over caller owned operand memory.
///
/// The view is typed once, when it is created, and never reinterpreted afterwards.
pub struct GlobalBuffer<'a, E> {
    ptr: *const E,
    len: usize,
    _lifetime: PhantomData<&'a [E]>,
}

/// Writable view over caller owned output memory.
pub struct GlobalBufferMut<'a, E> {
    ptr: *mut E,
    len: usize,
    _lifetime: PhantomData<&'a mut [E]>,
}

// The views behave like `&[E]` and `&mut [E]`.
unsafe impl<E: Sync> Send for GlobalBuffer<'_, E> {}
unsafe impl<E: Sync> Sync for GlobalBuffer<'_, E> {}
unsafe impl<E: Send> Send for GlobalBufferMut<'_, E> {}
unsafe impl<E: Sync> Sync for GlobalBufferMut<'_, E> {}

impl<'a, E> GlobalBuffer<'a, E> {
    /// View over `len` elements starting at `address`.
    ///
    /// # Safety
    ///
    /// `address` must point to `len` elements of type `E`, which the launcher can read, that
    /// stay alive and unmodified for `'a`.
    pub unsafe fn from_raw(address: *const E, len: usize) -> Self {
        Self {
            ptr: address,
            len,
            _lifetime: PhantomData,
        }
    }

    pub fn from_host_slice(slice: &'a [E]) -> Self {
        Self {
            ptr: slice.as_ptr(),
            len: slice.len(),
            _lifetime: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_ptr(&self) -> *const E {
        self.ptr
    }

    /// The elements of the view.
    ///
    /// # Safety
    ///
    /// The view must address host memory, e.g. be built with [GlobalBuffer::from_host_slice].
    pub unsafe fn as_host_slice(&self) -> &'a [E] {
        unsafe { core::slice::from_raw_parts(self.ptr, self.len) }
    }
}

impl<E> Clone for GlobalBuffer<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for GlobalBuffer<'_, E> {}

impl<'a, E> GlobalBufferMut<'a, E> {
    /// View over `len` writable elements starting at `address`.
    ///
    /// # Safety
    ///
    /// `address` must point to `len` elements of type `E`, which the launcher can write, that
    /// stay alive for `'a` and are accessed by nothing else in the meantime.
    pub unsafe fn from_raw(address: *mut E, len: usize) -> Self {
        Self {
            ptr: address,
            len,
            _lifetime: PhantomData,
        }
    }

    pub fn from_host_slice(slice: &'a mut [E]) -> Self {
        Self {
            ptr: slice.as_mut_ptr(),
            len: slice.len(),
            _lifetime: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_ptr(&self) -> *const E {
        self.ptr
    }

    /// Address the kernel writes to.
    ///
    /// # Safety
    ///
    /// Writes must stay within the view and must not race with other writes to the same
    /// elements.
    pub unsafe fn as_mut_ptr(&self) -> *mut E {
        self.ptr
    }

    /// Shorter lived view over the same memory, so the original can be used again once the
    /// reborrow is dropped.
    pub fn reborrow(&mut self) -> GlobalBufferMut<'_, E> {
        GlobalBufferMut {
            ptr: self.ptr,
            len: self.len,
            _lifetime: PhantomData,
        }
    }
}

impl<E> Debug for GlobalBuffer<'_, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GlobalBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

impl<E> Debug for GlobalBufferMut<'_, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GlobalBufferMut")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

/// Memory of every operand of a fused matmul.
pub struct FusedMatmulInputs<'a, S: FusedMatmulSpec, const NA: usize, const NB: usize, const ND: usize>
{
    pub as_grid: [GlobalBuffer<'a, AsG<S>>; NA],
    pub bs_grid: [GlobalBuffer<'a, BsG<S>>; NB],
    pub ds_grid: [GlobalBuffer<'a, DsG<S>>; ND],
    pub e_grid: GlobalBufferMut<'a, EG<S>>,
}

impl<'a, S: FusedMatmulSpec, const NA: usize, const NB: usize, const ND: usize>
    FusedMatmulInputs<'a, S, NA, NB, ND>
{
    pub fn new(
        as_grid: [GlobalBuffer<'a, AsG<S>>; NA],
        bs_grid: [GlobalBuffer<'a, BsG<S>>; NB],
        ds_grid: [GlobalBuffer<'a, DsG<S>>; ND],
        e_grid: GlobalBufferMut<'a, EG<S>>,
    ) -> Self {
        Self {
            as_grid,
            bs_grid,
            ds_grid,
            e_grid,
        }
    }

    /// Views over the same memory for one more argument, e.g. to probe another variant.
    pub fn reborrow(&mut self) -> FusedMatmulInputs<'_, S, NA, NB, ND> {
        FusedMatmulInputs {
            as_grid: self.as_grid,
            bs_grid: self.bs_grid,
            ds_grid: self.ds_grid,
            e_grid: self.e_grid.reborrow(),
        }
    }
}

impl<S: FusedMatmulSpec, const NA: usize, const NB: usize, const ND: usize> Debug
    for FusedMatmulInputs<'_, S, NA, NB, ND>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FusedMatmulInputs")
            .field("as_grid", &self.as_grid)
            .field("bs_grid", &self.bs_grid)
            .field("ds_grid", &self.ds_grid)
            .field("e_grid", &self.e_grid)
            .finish()
    }
}

/// Block level descriptors, when the argument passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorState<const NA: usize, const NB: usize, const ND: usize> {
    Populated(BlockDescriptors<NA, NB, ND>),
    Unpopulated(FusedMatmulInvalidProblem),
}

/// Everything a kernel variant needs to execute one fused matmul.
///
/// An argument is built for a single variant and a single dispatch. It is validated once
/// when created and is immutable afterwards: if validation fails, no block level descriptor
/// is derived and the argument can never be launched.
pub struct FusedMatmulArgument<'a, S: FusedMatmulSpec, const NA: usize, const NB: usize, const ND: usize>
{
    body: &'static str,
    blueprint: FusedMatmulBlueprint<NA, NB, ND>,
    problem: FusedMatmulProblem<NA, NB, ND>,
    inputs: FusedMatmulInputs<'a, S, NA, NB, ND>,
    descriptors: ProblemDescriptors<NA, NB, ND>,
    tile_map: BlockToETileMap,
    ops: ElementwiseOps<S::AOp, S::BOp, S::CdeOp>,
    state: DescriptorState<NA, NB, ND>,
}

impl<'a, S: FusedMatmulSpec, const NA: usize, const NB: usize, const ND: usize>
    FusedMatmulArgument<'a, S, NA, NB, ND>
{
    /// Builds the argument of kernel body `G` configured with `blueprint`.
    pub fn new<G: GridwiseFusedMatmul>(
        blueprint: FusedMatmulBlueprint<NA, NB, ND>,
        inputs: FusedMatmulInputs<'a, S, NA, NB, ND>,
        problem: FusedMatmulProblem<NA, NB, ND>,
        ops: ElementwiseOps<S::AOp, S::BOp, S::CdeOp>,
    ) -> Self {
        let descriptors = ProblemDescriptors::new(&problem, &blueprint);
        let tile_map = BlockToETileMap::new(
            &descriptors.e_grid_desc_m_n,
            blueprint.tile.m_per_block,
            blueprint.tile.n_per_block,
            blueprint.tile_order,
        );

        let state = match validate::<S, G, NA, NB, ND>(
            &blueprint,
            &problem,
            &inputs,
            &descriptors,
            &tile_map,
            &ops,
        ) {
            Ok(block) => DescriptorState::Populated(block),
            Err(reason) => DescriptorState::Unpopulated(reason),
        };

        Self {
            body: G::NAME,
            blueprint,
            problem,
            inputs,
            descriptors,
            tile_map,
            ops,
            state,
        }
    }

    /// Validates the argument again for kernel body `G` configured with `blueprint`.
    ///
    /// Returns the block level descriptors to hand to the kernel body.
    pub fn check<G: GridwiseFusedMatmul>(
        &self,
        blueprint: &FusedMatmulBlueprint<NA, NB, ND>,
    ) -> Result<&BlockDescriptors<NA, NB, ND>, FusedMatmulInvalidProblem> {
        if self.body != G::NAME || self.blueprint != *blueprint {
            return Err(FusedMatmulInvalidProblem::ArgumentMismatch);
        }

        let block = match &self.state {
            DescriptorState::Populated(block) => block,
            DescriptorState::Unpopulated(reason) => return Err(reason.clone()),
        };

        let fresh = validate::<S, G, NA, NB, ND>(
            blueprint,
            &self.problem,
            &self.inputs,
            &self.descriptors,
            &self.tile_map,
            &self.ops,
        )?;

        match fresh == *block {
            true => Ok(block),
            false => Err(FusedMatmulInvalidProblem::ArgumentMismatch),
        }
    }

    pub fn body(&self) -> &'static str {
        self.body
    }

    pub fn blueprint(&self) -> &FusedMatmulBlueprint<NA, NB, ND> {
        &self.blueprint
    }

    pub fn problem(&self) -> &FusedMatmulProblem<NA, NB, ND> {
        &self.problem
    }

    pub fn inputs(&self) -> &FusedMatmulInputs<'a, S, NA, NB, ND> {
        &self.inputs
    }

    pub fn problem_descriptors(&self) -> &ProblemDescriptors<NA, NB, ND> {
        &self.descriptors
    }

    pub fn tile_map(&self) -> &BlockToETileMap {
        &self.tile_map
    }

    pub fn ops(&self) -> &ElementwiseOps<S::AOp, S::BOp, S::CdeOp> {
        &self.ops
    }

    pub fn state(&self) -> &DescriptorState<NA, NB, ND> {
        &self.state
    }

    /// Block level descriptors, only available when the argument passed validation.
    pub fn block_descriptors(&self) -> Option<&BlockDescriptors<NA, NB, ND>> {
        match &self.state {
            DescriptorState::Populated(block) => Some(block),
            DescriptorState::Unpopulated(_) => None,
        }
    }

    /// Why the argument failed validation when it was built.
    pub fn rejection(&self) -> Option<&FusedMatmulInvalidProblem> {
        match &self.state {
            DescriptorState::Populated(_) => None,
            DescriptorState::Unpopulated(reason) => Some(reason),
        }
    }
}

impl<S: FusedMatmulSpec, const NA: usize, const NB: usize, const ND: usize> Debug
    for FusedMatmulArgument<'_, S, NA, NB, ND>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FusedMatmulArgument")
            .field("body", &self.body)
            .field("problem", &self.problem)
            .field("inputs", &self.inputs)
            .field("ops", &self.ops)
            .field("state", &self.state)
            .finish()
    }
}

fn validate<S: FusedMatmulSpec, G: GridwiseFusedMatmul, const NA: usize, const NB: usize, const ND: usize>(
    blueprint: &FusedMatmulBlueprint<NA, NB, ND>,
    problem: &FusedMatmulProblem<NA, NB, ND>,
    inputs: &FusedMatmulInputs<'_, S, NA, NB, ND>,
    descriptors: &ProblemDescriptors<NA, NB, ND>,
    tile_map: &BlockToETileMap,
    ops: &ElementwiseOps<S::AOp, S::BOp, S::CdeOp>,
) -> Result<BlockDescriptors<NA, NB, ND>, FusedMatmulInvalidProblem> {
    if NA == 0 || NB == 0 {
        return Err(FusedMatmulInvalidProblem::MissingOperand);
    }

    check_layout_support(&blueprint.layouts)?;
    check_operations(ops, NA, NB, ND)?;
    check_vector_access(blueprint, problem.m, problem.n, problem.k)?;
    G::check_validity::<S::Precision, NA, NB, ND>(blueprint, descriptors, tile_map)?;
    check_buffers(inputs, descriptors)?;

    let block = BlockDescriptors::new(descriptors, blueprint).map_err(|err| {
        FusedMatmulInvalidProblem::InvalidDescriptor {
            ident: OperandIdent::OUTPUT,
            reason: err.to_string(),
        }
    })?;

    match block.first_unrefined(descriptors) {
        None => Ok(block),
        Some(ident) => Err(FusedMatmulInvalidProblem::InvalidDescriptor {
            ident,
            reason: "the block descriptor does not cover the operand memory exactly".to_string(),
        }),
    }
}

fn check_buffers<S: FusedMatmulSpec, const NA: usize, const NB: usize, const ND: usize>(
    inputs: &FusedMatmulInputs<'_, S, NA, NB, ND>,
    descriptors: &ProblemDescriptors<NA, NB, ND>,
) -> Result<(), FusedMatmulInvalidProblem> {
    check_group(OperandGroup::A, &descriptors.as_grid_desc_m_k, &inputs.as_grid)?;
    check_group(OperandGroup::B, &descriptors.bs_grid_desc_n_k, &inputs.bs_grid)?;
    check_group(OperandGroup::D, &descriptors.ds_grid_desc_m_n, &inputs.ds_grid)?;

    check_buffer(
        OperandIdent::OUTPUT,
        &descriptors.e_grid_desc_m_n,
        inputs.e_grid.len(),
    )
}

fn check_group<E>(
    group: OperandGroup,
    descriptors: &[TensorDescriptor],
    buffers: &[GlobalBuffer<'_, E>],
) -> Result<(), FusedMatmulInvalidProblem> {
    for (index, (desc, buffer)) in descriptors.iter().zip(buffers).enumerate() {
        check_buffer(OperandIdent::new(group, index), desc, buffer.len())?;
    }

    Ok(())
}
