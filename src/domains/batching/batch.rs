use super::params::GenerationParams;
use super::request::{PendingRequest, ResultSlot};
use crate::common::BatchError;
use uuid::Uuid;

/// Snapshot of an engine queue taken at flush time, in arrival order.
#[derive(Debug)]
pub struct Batch {
    pub id: Uuid,
    requests: Vec<PendingRequest>,
}

impl Batch {
    pub fn new(requests: Vec<PendingRequest>) -> Self {
        Self {
            id: Uuid::new_v4(),
            requests,
        }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn requests(&self) -> &[PendingRequest] {
        &self.requests
    }

    /// True when every member carries the same parameters as the first one.
    pub fn is_homogeneous(&self) -> bool {
        match self.requests.split_first() {
            Some((head, rest)) => rest.iter().all(|r| r.params == head.params),
            None => true,
        }
    }

    /// Splits into consecutive runs of equal parameters. Arrival order is
    /// preserved both inside and across the returned batches.
    pub fn split_by_parameters(self) -> Vec<Batch> {
        let mut runs: Vec<Vec<PendingRequest>> = Vec::new();
        for request in self.requests {
            match runs.last_mut() {
                Some(run) if run[0].params == request.params => run.push(request),
                _ => runs.push(vec![request]),
            }
        }
        runs.into_iter().map(Batch::new).collect()
    }

    /// Separates what the executor needs from the slots that receive its
    /// outcome. The whole batch runs with the parameters of its first member.
    pub fn into_call(self) -> (Vec<String>, GenerationParams, BatchSlots) {
        let params = self
            .requests
            .first()
            .map(|r| r.params.clone())
            .unwrap_or_default();
        let mut prompts = Vec::with_capacity(self.requests.len());
        let mut slots = Vec::with_capacity(self.requests.len());
        for request in self.requests {
            prompts.push(request.content);
            slots.push(request.slot);
        }
        (prompts, params, BatchSlots(slots))
    }
}

/// Counts of what a batch delivered to its callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub succeeded: usize,
    pub failed: usize,
}

/// Result slots of a dispatched batch, positionally aligned with its prompts.
#[derive(Debug)]
pub struct BatchSlots(Vec<ResultSlot>);

impl BatchSlots {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolves every slot from one executor outcome. A batch succeeds or
    /// fails as a unit: an error, or an output list whose length does not
    /// match the prompt list, fails every member with the same error.
    pub fn deliver(self, outcome: anyhow::Result<Vec<String>>) -> Delivery {
        let expected = self.0.len();
        match outcome {
            Ok(outputs) if outputs.len() == expected => {
                for (slot, text) in self.0.into_iter().zip(outputs) {
                    slot.resolve(Ok(text));
                }
                Delivery {
                    succeeded: expected,
                    failed: 0,
                }
            }
            Ok(outputs) => self.fail(BatchError::executor(anyhow::anyhow!(
                "executor returned {} results for {} prompts",
                outputs.len(),
                expected
            ))),
            Err(err) => self.fail(BatchError::executor(err)),
        }
    }

    pub fn fail(self, err: BatchError) -> Delivery {
        let failed = self.0.len();
        for slot in self.0 {
            slot.resolve(Err(err.clone()));
        }
        Delivery {
            succeeded: 0,
            failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::batching::request::ResultHandle;

    fn request(content: &str, params: GenerationParams) -> (PendingRequest, ResultHandle) {
        PendingRequest::new(content.to_string(), params)
    }

    #[tokio::test]
    async fn deliver_resolves_in_order() {
        let (a, ha) = request("a", GenerationParams::new());
        let (b, hb) = request("b", GenerationParams::new());
        let (prompts, _, slots) = Batch::new(vec![a, b]).into_call();
        assert_eq!(prompts, vec!["a", "b"]);

        let delivery = slots.deliver(Ok(vec!["A".into(), "B".into()]));
        assert_eq!(delivery, Delivery { succeeded: 2, failed: 0 });
        assert_eq!(ha.await.unwrap(), "A");
        assert_eq!(hb.await.unwrap(), "B");
    }

    #[tokio::test]
    async fn count_mismatch_fails_every_member() {
        let (a, ha) = request("a", GenerationParams::new());
        let (b, hb) = request("b", GenerationParams::new());
        let (_, _, slots) = Batch::new(vec![a, b]).into_call();

        let delivery = slots.deliver(Ok(vec!["only one".into()]));
        assert_eq!(delivery.failed, 2);
        for handle in [ha, hb] {
            let err = handle.await.unwrap_err();
            assert!(err.is_executor_failure());
            assert!(err.to_string().contains("1 results for 2 prompts"));
        }
    }

    #[test]
    fn first_member_parameters_win() {
        let hot = GenerationParams::new().with("temperature", 1.0);
        let cold = GenerationParams::new().with("temperature", 0.0);
        let (a, _ha) = request("a", hot.clone());
        let (b, _hb) = request("b", cold);
        let batch = Batch::new(vec![a, b]);
        assert!(!batch.is_homogeneous());

        let (_, params, _) = batch.into_call();
        assert_eq!(params, hot);
    }

    #[test]
    fn split_keeps_consecutive_runs_in_order() {
        let hot = GenerationParams::new().with("temperature", 1.0);
        let cold = GenerationParams::new().with("temperature", 0.0);
        let (a, _h1) = request("a", hot.clone());
        let (b, _h2) = request("b", hot.clone());
        let (c, _h3) = request("c", cold.clone());
        let (d, _h4) = request("d", hot.clone());

        let runs = Batch::new(vec![a, b, c, d]).split_by_parameters();
        let contents: Vec<Vec<&str>> = runs
            .iter()
            .map(|b| b.requests().iter().map(|r| r.content.as_str()).collect())
            .collect();
        assert_eq!(contents, vec![vec!["a", "b"], vec!["c"], vec!["d"]]);
        assert!(runs.iter().all(Batch::is_homogeneous));
    }
}
