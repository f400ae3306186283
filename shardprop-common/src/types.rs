use serde::{Deserialize, Serialize};

pub type VertexId = u64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Vertex<K, VV> {
    pub id: K,
    pub value: VV,
}

impl<K, VV> Vertex<K, VV> {
    pub fn new(id: K, value: VV) -> Self {
        Self { id, value }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge<K, EV> {
    pub src_id: K,
    pub target_id: K,
    pub value: EV,
}

impl<K, EV> Edge<K, EV> {
    pub fn new(src_id: K, target_id: K, value: EV) -> Self {
        Self {
            src_id,
            target_id,
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct VertexInterval {
    pub start: VertexId,
    pub end: VertexId,
}

impl VertexInterval {
    pub fn new(start: VertexId, end: VertexId) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, id: VertexId) -> bool {
        id >= self.start && id <= self.end
    }

    pub fn len(&self) -> u64 {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> std::ops::RangeInclusive<VertexId> {
        self.start..=self.end
    }

    pub fn split(num_vertices: u64, count: usize) -> Vec<VertexInterval> {
        if num_vertices == 0 || count == 0 {
            return Vec::new();
        }
        let count = (count as u64).min(num_vertices);
        let base = num_vertices / count;
        let extra = num_vertices % count;
        let mut out = Vec::with_capacity(count as usize);
        let mut start = 0;
        for i in 0..count {
            let len = base + u64::from(i < extra);
            out.push(VertexInterval::new(start, start + len - 1));
            start += len;
        }
        out
    }
}

impl std::fmt::Display for VertexInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}
