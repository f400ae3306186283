use shardprop_api::scheduler::Scheduler;
use shardprop_common::types::VertexId;
use std::sync::atomic::{AtomicU64, Ordering};

const WORD_BITS: u64 = 64;

#[derive(Debug)]
pub struct SelectiveScheduler {
    num_vertices: u64,
    current: Vec<u64>,
    next: Vec<AtomicU64>,
}

impl SelectiveScheduler {
    pub fn new(num_vertices: u64) -> Self {
        let words = num_vertices.div_ceil(WORD_BITS) as usize;
        let mut scheduler = Self {
            num_vertices,
            current: vec![0; words],
            next: (0..words).map(|_| AtomicU64::new(0)).collect(),
        };
        scheduler.activate_all();
        scheduler
    }

    pub fn activate_all(&mut self) {
        for (i, word) in self.current.iter_mut().enumerate() {
            let remaining = self.num_vertices - i as u64 * WORD_BITS;
            *word = if remaining >= WORD_BITS {
                u64::MAX
            } else {
                (1u64 << remaining) - 1
            };
        }
    }

    pub fn pending_count(&self) -> u64 {
        self.next
            .iter()
            .map(|w| u64::from(w.load(Ordering::Relaxed).count_ones()))
            .sum()
    }

    fn locate(&self, vertex_id: VertexId) -> Option<(usize, u64)> {
        if vertex_id >= self.num_vertices {
            return None;
        }
        Some(((vertex_id / WORD_BITS) as usize, 1u64 << (vertex_id % WORD_BITS)))
    }
}

impl Scheduler for SelectiveScheduler {
    fn is_active(&self, vertex_id: VertexId) -> bool {
        match self.locate(vertex_id) {
            Some((word, bit)) => self.current[word] & bit != 0,
            None => false,
        }
    }

    fn mark_active(&self, vertex_id: VertexId) {
        if let Some((word, bit)) = self.locate(vertex_id) {
            self.next[word].fetch_or(bit, Ordering::Relaxed);
        }
    }

    fn reset(&mut self) {
        self.current.iter_mut().for_each(|w| *w = 0);
        self.next.iter_mut().for_each(|w| *w.get_mut() = 0);
    }

    fn advance(&mut self) {
        for (cur, next) in self.current.iter_mut().zip(self.next.iter_mut()) {
            *cur = std::mem::take(next.get_mut());
        }
    }

    fn active_count(&self) -> u64 {
        self.current.iter().map(|w| u64::from(w.count_ones())).sum()
    }

    fn is_selective(&self) -> bool {
        true
    }
}
