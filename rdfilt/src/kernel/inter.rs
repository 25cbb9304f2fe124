//! Inter-block recursive doubling

use crate::block::DataBlock;
use crate::coeff::SectionTables;
use crate::history::History;
use crate::simd::LaneVector;

/// Chains y-history across blocks, one group at a time.
///
/// Each incoming block carries, in the top lane of its last two rows, the
/// y pair it would end on if its own entering history were zero. Gathering
/// those pairs across a group of G blocks, seeding lane 0 with the running
/// register advanced by one block, and then composing companion powers in
/// log2(G) doubling passes yields every block's true entering history in
/// one sweep. Groups of M use full-width vectors, M/2 the half-width ones;
/// two blocks and one block are cheaper in the closed scalar form.
///
/// The register starts from the section's (y(-2), y(-1)) and, once updated
/// from a group's tail, seeds the next group; on the last block its final
/// contents are appended to `post_inits`.
pub struct InterBlockRd<'t, V, H, const M: usize>
where
    V: LaneVector,
    H: LaneVector<Scalar = V::Scalar>,
{
    tables: &'t SectionTables<V, H, M>,
    hist: History<V::Scalar>,
}

impl<'t, V, H, const M: usize> InterBlockRd<'t, V, H, M>
where
    V: LaneVector,
    H: LaneVector<Scalar = V::Scalar>,
{
    /// `y2` and `y1` are the stream's y(-2) and y(-1) ahead of the first
    /// block of this section.
    pub fn new(tables: &'t SectionTables<V, H, M>, y2: V::Scalar, y1: V::Scalar) -> Self {
        Self {
            tables,
            hist: History::seeded(y2, y1),
        }
    }

    /// Fills in `y_inits` for every block of one group. Blocks arrive in
    /// tag order and group sizes follow the buffer's flush schedule.
    pub fn apply(&mut self, group: &mut [DataBlock<V, M>]) {
        match group.len() {
            g if g == M => self.group_wide(group),
            g if g == M / 2 => self.group_half(group),
            2 => self.group_pair(group),
            1 => self.group_single(group),
            g => debug_assert!(false, "group of {} blocks has no doubling schedule", g),
        }
    }

    fn group_wide(&mut self, group: &mut [DataBlock<V, M>]) {
        let t = self.tables;

        let mut l2 = V::zero().to_lanes();
        let mut l1 = V::zero().to_lanes();
        for (j, b) in group.iter().enumerate() {
            l2[j] = b.data[M - 2].lane(M - 1);
            l1[j] = b.data[M - 1].lane(M - 1);
        }
        let mut yi2 = V::from_lanes(l2);
        let mut yi1 = V::from_lanes(l1);

        // Seed lane 0 with the previous group's tail, advanced one block.
        let s2 = V::splat(self.hist.prev2());
        let s1 = V::splat(self.hist.prev1());
        yi2 = t.inter_seed.c22.mul_add(s2, yi2);
        yi2 = t.inter_seed.c12.mul_add(s1, yi2);
        yi1 = t.inter_seed.c21.mul_add(s2, yi1);
        yi1 = t.inter_seed.c11.mul_add(s1, yi1);

        for (k, pass) in t.inter.iter().enumerate() {
            let c2 = yi2.rd_gather(k as u32);
            let c1 = yi1.rd_gather(k as u32);
            let mut n2 = c2.mul_add(pass.c22, yi2);
            n2 = c1.mul_add(pass.c12, n2);
            let mut n1 = c2.mul_add(pass.c21, yi1);
            n1 = c1.mul_add(pass.c11, n1);
            yi2 = n2;
            yi1 = n1;
        }

        // Lane j now ends block j; shifted one lane up it enters block j.
        let init2 = yi2.shift_in(self.hist.prev2()).to_lanes();
        let init1 = yi1.shift_in(self.hist.prev1()).to_lanes();
        self.hist.shift(yi2.lane(M - 1));
        self.hist.shift(yi1.lane(M - 1));

        self.finish(group, init2.as_ref(), init1.as_ref());
    }

    fn group_half(&mut self, group: &mut [DataBlock<V, M>]) {
        let t = self.tables;
        let g = M / 2;

        let mut l2 = H::zero().to_lanes();
        let mut l1 = H::zero().to_lanes();
        for (j, b) in group.iter().enumerate() {
            l2[j] = b.data[M - 2].lane(M - 1);
            l1[j] = b.data[M - 1].lane(M - 1);
        }
        let mut yi2 = H::from_lanes(l2);
        let mut yi1 = H::from_lanes(l1);

        let s2 = H::splat(self.hist.prev2());
        let s1 = H::splat(self.hist.prev1());
        yi2 = t.half_seed.c22.mul_add(s2, yi2);
        yi2 = t.half_seed.c12.mul_add(s1, yi2);
        yi1 = t.half_seed.c21.mul_add(s2, yi1);
        yi1 = t.half_seed.c11.mul_add(s1, yi1);

        for (k, pass) in t.half.iter().enumerate() {
            let c2 = yi2.rd_gather(k as u32);
            let c1 = yi1.rd_gather(k as u32);
            let mut n2 = c2.mul_add(pass.c22, yi2);
            n2 = c1.mul_add(pass.c12, n2);
            let mut n1 = c2.mul_add(pass.c21, yi1);
            n1 = c1.mul_add(pass.c11, n1);
            yi2 = n2;
            yi1 = n1;
        }

        let init2 = yi2.shift_in(self.hist.prev2()).to_lanes();
        let init1 = yi1.shift_in(self.hist.prev1()).to_lanes();
        self.hist.shift(yi2.lane(g - 1));
        self.hist.shift(yi1.lane(g - 1));

        self.finish(group, init2.as_ref(), init1.as_ref());
    }

    fn group_pair(&mut self, group: &mut [DataBlock<V, M>]) {
        let (c22, c12, c21, c11) = self.block_advance();
        let s2 = self.hist.prev2();
        let s1 = self.hist.prev1();

        let v2 = c22 * s2 + c12 * s1 + group[0].data[M - 2].lane(M - 1);
        let v1 = c21 * s2 + c11 * s1 + group[0].data[M - 1].lane(M - 1);
        let y2 = c22 * v2 + c12 * v1 + group[1].data[M - 2].lane(M - 1);
        let y1 = c21 * v2 + c11 * v1 + group[1].data[M - 1].lane(M - 1);

        let init2 = [s2, v2];
        let init1 = [s1, v1];
        self.hist.shift(y2);
        self.hist.shift(y1);

        self.finish(group, &init2, &init1);
    }

    fn group_single(&mut self, group: &mut [DataBlock<V, M>]) {
        let (c22, c12, c21, c11) = self.block_advance();
        let s2 = self.hist.prev2();
        let s1 = self.hist.prev1();

        let y2 = c22 * s2 + c12 * s1 + group[0].data[M - 2].lane(M - 1);
        let y1 = c21 * s2 + c11 * s1 + group[0].data[M - 1].lane(M - 1);

        let init2 = [s2];
        let init1 = [s1];
        self.hist.shift(y2);
        self.hist.shift(y1);

        self.finish(group, &init2, &init1);
    }

    /// The scalar matrix advancing the y pair across one whole block.
    fn block_advance(&self) -> (V::Scalar, V::Scalar, V::Scalar, V::Scalar) {
        let t = self.tables;
        (t.c22[M - 1], t.c12[M - 1], t.c21[M - 1], t.c11[M - 1])
    }

    fn finish(
        &self,
        group: &mut [DataBlock<V, M>],
        init2: &[V::Scalar],
        init1: &[V::Scalar],
    ) {
        let g = group.len();
        for b in group.iter_mut() {
            b.y_inits = [init2[b.tag % g], init1[b.tag % g]];
            if b.last {
                b.post_inits.push(self.hist.prev2());
                b.post_inits.push(self.hist.prev1());
            }
        }
    }
}
