//! Multicore pipeline wiring
//!
//! One invocation builds the whole graph on scoped threads, streams the
//! input through it, and tears it down again: source → prior permute →
//! N × (init adder → ZIC → intra doubling → group buffer → inter doubling
//! → forward correction) → post permute → sink. Stateless stages run on a
//! small worker set each; stateful ones are single threads fed in tag
//! order. The sink is the calling thread.

use std::mem;
use std::thread;

use rdfilt_flow as flow;
use tracing::debug;

use crate::block::{transpose, DataBlock};
use crate::coeff::SectionTables;
use crate::kernel::buffer::GroupBuffer;
use crate::kernel::init_adder::InitAdder;
use crate::kernel::inter::InterBlockRd;
use crate::kernel::{icc, intra, zic};
use crate::series::SectionState;
use crate::simd::LaneVector;

/// In-flight blocks allowed per edge before the upstream stage parks.
const EDGE_CAPACITY: usize = 32;

fn worker_count() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, 8)
}

/// Runs the block pipeline over `input`, which must be a whole number of
/// M×M blocks, writing the filtered stream to the front of `output`.
///
/// Returns the final history values harvested from the last block's
/// `post_inits`: four per section, in section order, for the driver to
/// continue the stream from.
pub fn run<V, H, const M: usize>(
    tables: &[SectionTables<V, H, M>],
    states: &[SectionState<V::Scalar>],
    input: &[V::Scalar],
    output: &mut [V::Scalar],
) -> Vec<V::Scalar>
where
    V: LaneVector,
    H: LaneVector<Scalar = V::Scalar>,
{
    let block_len = M * M;
    debug_assert_eq!(input.len() % block_len, 0, "input must be whole blocks");
    debug_assert!(output.len() >= input.len());
    debug_assert_eq!(tables.len(), states.len());

    let n_blocks = input.len() / block_len;
    let workers = worker_count();
    debug!(
        blocks = n_blocks,
        sections = tables.len(),
        workers,
        "multicore pass"
    );

    let mut post_inits = Vec::new();

    thread::scope(|scope| {
        // Source: chunk and tag the input, flagging the final block.
        let (tx_source, rx_source) = flow::bounded::<DataBlock<V, M>>(EDGE_CAPACITY);
        thread::Builder::new()
            .name("source".into())
            .spawn_scoped(scope, move || {
                for (tag, chunk) in input.chunks_exact(block_len).enumerate() {
                    let block = DataBlock::from_samples(tag, chunk, tag + 1 == n_blocks);
                    if tx_source.send(block).is_err() {
                        break;
                    }
                }
            })
            .expect("failed to spawn source");

        let (tx, rx) = flow::bounded(EDGE_CAPACITY);
        flow::parallel(
            scope,
            "prior-permute",
            workers,
            rx_source,
            tx,
            |mut b: DataBlock<V, M>| {
                b.data = transpose(&b.data);
                b
            },
        );
        let mut upstream = rx;

        for (t, s) in tables.iter().zip(states) {
            // x-history attachment, back in tag order behind the
            // concurrent stage above.
            let (tx, rx) = flow::bounded(EDGE_CAPACITY);
            let mut adder = InitAdder::new(s.x2, s.x1);
            flow::serial_tagged(
                scope,
                "init-adder",
                upstream,
                tx,
                |b: &DataBlock<V, M>| b.tag,
                move |mut b, out| {
                    adder.apply(&mut b);
                    let _ = out.send(b);
                },
            );

            let (tx_zic, rx_zic) = flow::bounded(EDGE_CAPACITY);
            flow::parallel(scope, "zic", workers, rx, tx_zic, move |mut b| {
                zic::apply(t, &mut b);
                b
            });

            let (tx_rd, rx_rd) = flow::bounded(EDGE_CAPACITY);
            flow::parallel(scope, "intra-rd", workers, rx_zic, tx_rd, move |mut b| {
                intra::apply(t, &mut b);
                b
            });

            // Grouping wants tag order again.
            let (tx_grp, rx_grp) = flow::bounded::<Vec<DataBlock<V, M>>>(EDGE_CAPACITY);
            let mut groups = GroupBuffer::new();
            flow::serial_tagged(
                scope,
                "group-buffer",
                rx_rd,
                tx_grp,
                |b: &DataBlock<V, M>| b.tag,
                move |b, out| {
                    for g in groups.push(b) {
                        let _ = out.send(g);
                    }
                },
            );

            // Groups already arrive oldest-first from the serial buffer.
            let (tx_inter, rx_inter) = flow::bounded(EDGE_CAPACITY);
            let mut rd = InterBlockRd::new(t, s.y2, s.y1);
            flow::serial(scope, "inter-rd", rx_grp, tx_inter, move |mut g, out| {
                rd.apply(&mut g);
                for b in g {
                    let _ = out.send(b);
                }
            });

            let (tx_fwd, rx_fwd) = flow::bounded(EDGE_CAPACITY);
            flow::parallel(scope, "icc-forward", workers, rx_inter, tx_fwd, move |mut b| {
                icc::apply(t, &mut b);
                b
            });

            upstream = rx_fwd;
        }

        let (tx_post, rx_post) = flow::bounded(EDGE_CAPACITY);
        flow::serial(
            scope,
            "post-permute",
            upstream,
            tx_post,
            |mut b: DataBlock<V, M>, out| {
                b.data = transpose(&b.data);
                let _ = out.send(b);
            },
        );

        // Sink: restore stream order, write rows out, harvest the final
        // history from the last block.
        let mut seq = flow::Sequencer::new();
        for block in rx_post {
            seq.push(block.tag, block);
            while let Some(mut b) = seq.pop_ready() {
                if b.last {
                    post_inits = mem::take(&mut b.post_inits);
                }
                let base = b.tag * block_len;
                for n in 0..M {
                    b.data[n].write_to(&mut output[base + n * M..base + (n + 1) * M]);
                }
            }
        }
    });

    debug_assert_eq!(post_inits.len(), 4 * tables.len());
    post_inits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coeff::Biquad;
    use crate::series::Series;
    use approx::assert_relative_eq;
    use wide::{f32x4, f32x8};

    fn setup(n: usize) -> (Vec<SectionTables<f32x8, f32x4, 8>>, Series<f32>) {
        let biquad = Biquad {
            b1: 0.1,
            b2: -0.5,
            a1: 0.2,
            a2: 0.3,
        };
        let state = SectionState {
            x1: 2.0,
            x2: 3.0,
            y1: -0.5,
            y2: 1.5,
        };
        let tables = (0..n).map(|_| SectionTables::new(biquad)).collect();
        let series = Series::new(vec![(biquad, state); n]);
        (tables, series)
    }

    #[test]
    fn one_block_matches_the_scalar_cascade() {
        let (tables, mut reference) = setup(2);
        let input: Vec<f32> = (0..64).map(|v| v as f32).collect();
        let mut output = vec![0.0f32; 64];

        let post = run(&tables, &reference.states(), &input, &mut output);

        for (n, &x) in input.iter().enumerate() {
            let expected = reference.step_scalar(x);
            assert_relative_eq!(output[n], expected, epsilon = 1e-3, max_relative = 1e-4);
        }
        assert_eq!(post.len(), 8);
        // Section 0 ended on the raw input samples 62, 63.
        assert_eq!(post[0], 62.0);
        assert_eq!(post[1], 63.0);
    }

    #[test]
    fn many_blocks_exercise_every_group_size() {
        // 13 blocks: a full group plus the 4- and 1-block fallbacks.
        let (tables, mut reference) = setup(2);
        let input: Vec<f32> = (0..13 * 64).map(|v| (v as f32 * 0.021).sin()).collect();
        let mut output = vec![0.0f32; input.len()];

        run(&tables, &reference.states(), &input, &mut output);

        for (n, &x) in input.iter().enumerate() {
            let expected = reference.step_scalar(x);
            assert_relative_eq!(output[n], expected, epsilon = 1e-3, max_relative = 1e-3);
        }
    }

    #[test]
    fn harvested_history_continues_the_stream() {
        let (tables, mut reference) = setup(3);
        let input: Vec<f32> = (0..8 * 64).map(|v| (v as f32 * 0.01).cos()).collect();
        let mut output = vec![0.0f32; input.len()];

        let post = run(&tables, &reference.states(), &input, &mut output);

        // Running the scalar cascade over the same samples must leave it in
        // exactly the state the pipeline harvested.
        for &x in &input {
            reference.step_scalar(x);
        }
        for (chunk, state) in post.chunks_exact(4).zip(reference.states()) {
            assert_relative_eq!(chunk[0], state.x2, epsilon = 1e-3, max_relative = 1e-3);
            assert_relative_eq!(chunk[1], state.x1, epsilon = 1e-3, max_relative = 1e-3);
            assert_relative_eq!(chunk[2], state.y2, epsilon = 1e-3, max_relative = 1e-3);
            assert_relative_eq!(chunk[3], state.y1, epsilon = 1e-3, max_relative = 1e-3);
        }
    }
}
