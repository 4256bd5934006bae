// THEORY:
// The `pool` module spreads pair analysis across a fixed set of workers. A
// single dispatcher task receives submitted pairs and hands them out
// round-robin; each worker owns its own copy of the run context and replies
// through a oneshot channel. Pairs are independent, so no state is shared
// between workers.

use tokio::sync::{mpsc, oneshot};

use crate::analysis::{RunContext, run_pair};
use crate::discovery::MeasurementPair;
use crate::summary::PairOutcome;

pub struct PairTask {
    pub pair: MeasurementPair,
    pub result_sender: oneshot::Sender<PairOutcome>,
}

pub struct WorkerPool {
    task_sender: mpsc::UnboundedSender<PairTask>,
    workers: Vec<tokio::task::JoinHandle<()>>,
    pool_size: usize,
}

impl WorkerPool {
    pub fn new(context: RunContext) -> Self {
        let pool_size = num_cpus::get().max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<PairTask>();
        let mut workers = Vec::new();

        // Create a single dispatcher that distributes tasks to workers
        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..pool_size)
            .map(|_| mpsc::unbounded_channel::<PairTask>())
            .unzip();

        // Spawn dispatcher
        let dispatcher_senders = worker_senders;
        tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                let _ = dispatcher_senders[worker_idx].send(task);
                worker_idx = (worker_idx + 1) % pool_size;
            }
        });

        // Spawn workers
        for mut worker_receiver in worker_receivers {
            let worker_context = context.clone();

            let worker = tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    let outcome = run_pair(&worker_context, &task.pair);
                    let _ = task.result_sender.send(outcome);
                }
            });

            workers.push(worker);
        }

        Self {
            task_sender,
            workers,
            pool_size,
        }
    }

    pub fn size(&self) -> usize {
        self.pool_size
    }

    /// Submits one pair and waits for its outcome.
    pub async fn process_pair(&self, pair: MeasurementPair) -> Result<PairOutcome, &'static str> {
        let (result_sender, result_receiver) = oneshot::channel();

        let task = PairTask {
            pair,
            result_sender,
        };

        self.task_sender
            .send(task)
            .map_err(|_| "Failed to send task to worker pool")?;

        result_receiver
            .await
            .map_err(|_| "Failed to receive result from worker")
    }

    /// Stops accepting work and waits for the workers to drain.
    pub async fn shutdown(self) {
        drop(self.task_sender);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use globulink::pipeline::LinkerConfig;
    use std::path::PathBuf;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("globulink_pool_{tag}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_pair(dir: &PathBuf, base: &str) -> MeasurementPair {
        let globule_table = dir.join(format!("DIC_{base}.txt"));
        let crescent_table = dir.join(format!("RG_{base}.txt"));
        std::fs::write(
            &globule_table,
            "  \t\n \tArea\tX\tY\tPerim.\tCirc.\n400.0\t105.0\t100.0\t70.9\t1.0\n",
        )
        .unwrap();
        std::fs::write(
            &crescent_table,
            "  \t\n \tArea\tX\tY\tPerim.\tCirc.\n100.0\t100.0\t100.0\t35.4\t1.0\n",
        )
        .unwrap();
        MeasurementPair {
            base_name: base.to_string(),
            globule_table,
            crescent_table,
            contamination_table: None,
        }
    }

    #[tokio::test]
    async fn processes_pairs_and_preserves_submission_order() {
        let dir = scratch_dir("order");
        let pairs = vec![
            write_pair(&dir, "slide_a"),
            write_pair(&dir, "slide_b"),
            write_pair(&dir, "slide_c"),
        ];

        let pool = WorkerPool::new(RunContext {
            output_dir: dir.clone(),
            image_width: 200,
            image_height: 200,
            config: LinkerConfig::default(),
            render_maps: false,
        });
        assert!(pool.size() >= 1);

        let futures: Vec<_> = pairs
            .iter()
            .map(|pair| pool.process_pair(pair.clone()))
            .collect();
        let outcomes = futures::future::join_all(futures).await;
        pool.shutdown().await;

        assert_eq!(outcomes.len(), 3);
        for (pair, outcome) in pairs.iter().zip(&outcomes) {
            let outcome = outcome.as_ref().expect("pool reply");
            assert_eq!(outcome.filename, pair.base_name);
            assert!(outcome.success, "unexpected failure: {:?}", outcome.error);
        }
        for base in ["slide_a", "slide_b", "slide_c"] {
            assert!(dir.join(format!("STAT_{base}.txt")).is_file());
        }

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn a_failing_pair_does_not_poison_the_pool() {
        let dir = scratch_dir("poison");
        let good = write_pair(&dir, "slide_ok");
        let bad = MeasurementPair {
            base_name: "slide_gone".to_string(),
            globule_table: dir.join("DIC_slide_gone.txt"),
            crescent_table: dir.join("RG_slide_gone.txt"),
            contamination_table: None,
        };

        let pool = WorkerPool::new(RunContext {
            output_dir: dir.clone(),
            image_width: 200,
            image_height: 200,
            config: LinkerConfig::default(),
            render_maps: false,
        });

        let bad_outcome = pool.process_pair(bad).await.expect("pool reply");
        let good_outcome = pool.process_pair(good).await.expect("pool reply");
        pool.shutdown().await;

        assert!(!bad_outcome.success);
        assert!(good_outcome.success);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
