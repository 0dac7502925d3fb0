use super::interaction::InteractionGraph;
use std::collections::{HashMap, VecDeque};

/// An undirected edge key with its endpoints in ascending order.
pub type EdgeKey = (usize, usize);

fn edge_key(a: usize, b: usize) -> EdgeKey {
    if a <= b { (a, b) } else { (b, a) }
}

/// Computes edge betweenness centrality for the edges among `nodes`.
///
/// Brandes' accumulation over unweighted shortest paths, unnormalized: the
/// value of an edge is the number of shortest paths between node pairs of the
/// subset that pass through it. Only edges with both endpoints in `nodes` are
/// traversed, so the subset behaves as an induced subgraph.
pub fn edge_betweenness(graph: &InteractionGraph, nodes: &[usize]) -> HashMap<EdgeKey, f64> {
    let member: HashMap<usize, usize> = nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();
    let n = nodes.len();
    let mut centrality: HashMap<EdgeKey, f64> = HashMap::new();

    let mut ordered: Vec<usize> = nodes.to_vec();
    ordered.sort_unstable();

    for &source in &ordered {
        // Single-source shortest-path counts (BFS).
        let mut sigma = vec![0.0_f64; n];
        let mut dist = vec![usize::MAX; n];
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut stack = Vec::with_capacity(n);
        let mut queue = VecDeque::new();

        let s = member[&source];
        sigma[s] = 1.0;
        dist[s] = 0;
        queue.push_back(source);

        while let Some(node) = queue.pop_front() {
            let v = member[&node];
            stack.push(node);
            for neighbor in graph.neighbors(node) {
                let Some(&w) = member.get(&neighbor) else {
                    continue;
                };
                if dist[w] == usize::MAX {
                    dist[w] = dist[v] + 1;
                    queue.push_back(neighbor);
                }
                if dist[w] == dist[v] + 1 {
                    sigma[w] += sigma[v];
                    predecessors[w].push(node);
                }
            }
        }

        // Dependency accumulation in reverse BFS order.
        let mut delta = vec![0.0_f64; n];
        while let Some(node) = stack.pop() {
            let w = member[&node];
            for &pred in &predecessors[w] {
                let v = member[&pred];
                let contribution = sigma[v] / sigma[w] * (1.0 + delta[w]);
                *centrality.entry(edge_key(pred, node)).or_insert(0.0) += contribution;
                delta[v] += contribution;
            }
        }
    }

    // Each undirected path is discovered from both of its endpoints.
    for value in centrality.values_mut() {
        *value /= 2.0;
    }
    centrality
}

/// The edge with the highest betweenness among `nodes`, with deterministic
/// lexicographic tie-breaking. `None` when the subset spans no edges.
pub fn max_betweenness_edge(graph: &InteractionGraph, nodes: &[usize]) -> Option<(EdgeKey, f64)> {
    let centrality = edge_betweenness(graph, nodes);
    centrality
        .into_iter()
        .max_by(|(edge_a, value_a), (edge_b, value_b)| {
            value_a
                .partial_cmp(value_b)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| edge_b.cmp(edge_a))
        })
}
