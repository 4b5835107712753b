//! Label scopes.
//!
//! Labels are local to the innermost scope opened with `StartLabels`. A
//! label operand emits a placeholder; closing the scope patches every
//! placeholder with the label's offset relative to the start of the
//! instruction that referenced it.

use rustc_hash::FxHashMap;
use weave_core::EncoderError;

use crate::heap::Heap;
use crate::ops::Label;

#[derive(Debug)]
struct Target {
    /// Address of the placeholder operand.
    at: u32,
    /// Address of the referencing instruction's header.
    instruction: u32,
    label: Label,
}

#[derive(Debug, Default)]
pub(crate) struct Labels {
    labels: FxHashMap<Label, u32>,
    targets: Vec<Target>,
}

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(&mut self, name: Label, offset: u32) {
        self.labels.insert(name, offset);
    }

    pub fn target(&mut self, at: u32, instruction: u32, label: Label) {
        self.targets.push(Target {
            at,
            instruction,
            label,
        });
    }

    /// Resolve every target in this scope.
    pub fn patch(self, heap: &mut Heap) -> Result<(), EncoderError> {
        for target in self.targets {
            let Some(&address) = self.labels.get(&target.label) else {
                return Err(EncoderError::MissingLabel {
                    name: target.label.into_owned(),
                });
            };
            let relative = address as i64 - target.instruction as i64;
            heap.patch(target.at, relative as i32 as u32);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_and_backward_targets() {
        let mut heap = Heap::new();
        for _ in 0..10 {
            heap.reserve();
        }
        let mut labels = Labels::new();
        labels.label("START".into(), 2);
        labels.label("END".into(), 9);
        labels.target(5, 4, "END".into());
        labels.target(7, 6, "START".into());
        labels.patch(&mut heap).unwrap();

        assert_eq!(heap.get_by_addr(5), 5);
        assert_eq!(heap.get_by_addr(7) as i32, -4);
    }

    #[test]
    fn missing_label_is_an_error() {
        let mut heap = Heap::new();
        heap.reserve();
        let mut labels = Labels::new();
        labels.target(0, 0, "ELSE".into());
        assert_eq!(
            labels.patch(&mut heap),
            Err(EncoderError::MissingLabel {
                name: "ELSE".to_string()
            })
        );
    }
}
