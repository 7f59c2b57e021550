//! Profile extraction and candidate filtering for graph-based algorithms.
//!
//! Concrete algorithms score nodes of a [`Graph`] for a user; the helpers
//! here turn a user into a weighted profile and restrict raw scores to the
//! nodes that may actually be recommended.
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;

use data::Interaction;
use graph::{Graph, Node, NodeKind};
use UserId;

/// Per-user candidate nodes: when present for a user, only these nodes are
/// scored.
pub type CandidateFilter = HashMap<UserId, HashSet<Node>>;

/// The nodes `user_id` links to, with the weights of those links.
///
/// A user missing from the graph has an empty profile. Successors whose
/// edge weight cannot be looked up are left out.
///
/// ```rust
/// # extern crate recsplit;
/// use recsplit::algorithm::extract_profile;
/// use recsplit::graph::{InteractionGraph, Node};
///
/// let mut graph = InteractionGraph::new();
/// graph.add_link(Node::User("u1".to_owned()), Node::Item("i1".to_owned()), 0.2);
/// graph.add_link(Node::User("u1".to_owned()), Node::Item("i2".to_owned()), 0.4);
///
/// let profile = extract_profile(&graph, "u1");
///
/// assert_eq!(profile[&Node::Item("i1".to_owned())], 0.2);
/// assert_eq!(profile[&Node::Item("i2".to_owned())], 0.4);
/// ```
pub fn extract_profile<G: Graph + ?Sized>(graph: &G, user_id: &str) -> HashMap<Node, f32> {
    let user_node = Node::User(user_id.to_owned());

    graph
        .successors(&user_node)
        .into_iter()
        .filter_map(|successor| {
            graph
                .edge_weight(&user_node, &successor)
                .map(|weight| (successor, weight))
        })
        .collect()
}

/// Settings shared by all graph-based algorithms.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphAlgorithmConfig {
    nodes_to_keep: HashSet<NodeKind>,
}

impl Default for GraphAlgorithmConfig {
    fn default() -> Self {
        let mut nodes_to_keep = HashSet::new();
        nodes_to_keep.insert(NodeKind::Item);

        GraphAlgorithmConfig { nodes_to_keep }
    }
}

impl GraphAlgorithmConfig {
    /// Keep only nodes of the given kinds when filtering without a
    /// candidate list.
    pub fn new<I: IntoIterator<Item = NodeKind>>(nodes_to_keep: I) -> Self {
        GraphAlgorithmConfig {
            nodes_to_keep: nodes_to_keep.into_iter().collect(),
        }
    }

    /// Also keep nodes of `kind`.
    pub fn keep(mut self, kind: NodeKind) -> Self {
        self.nodes_to_keep.insert(kind);
        self
    }

    /// Node kinds that may be recommended.
    pub fn nodes_to_keep(&self) -> &HashSet<NodeKind> {
        &self.nodes_to_keep
    }

    /// Restrict raw per-node results to recommendable nodes.
    ///
    /// With a `filter_list`, exactly the nodes of `result` that are in the
    /// list are kept, whatever their kind or whether the user already
    /// links to them. Without one, a node is kept if its kind is in
    /// `nodes_to_keep` and `user_node` does not already link to it.
    pub fn filter_result<G: Graph + ?Sized, S>(
        &self,
        graph: &G,
        result: HashMap<Node, S>,
        filter_list: Option<&HashSet<Node>>,
        user_node: &Node,
    ) -> HashMap<Node, S> {
        match filter_list {
            Some(filter_list) => result
                .into_iter()
                .filter(|&(ref node, _)| filter_list.contains(node))
                .collect(),
            None => {
                let profile: HashSet<Node> = graph.successors(user_node).into_iter().collect();

                result
                    .into_iter()
                    .filter(|&(ref node, _)| {
                        self.nodes_to_keep.contains(&node.kind()) && !profile.contains(node)
                    })
                    .collect()
            }
        }
    }
}

/// Operations a graph-based algorithm may support.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Score prediction.
    Predict,
    /// Top-n ranking.
    Rank,
}

/// Which operations an algorithm supports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// Supports score prediction.
    pub predict: bool,
    /// Supports ranking.
    pub rank: bool,
}

impl Capabilities {
    /// Whether `operation` is supported.
    pub fn supports(&self, operation: Operation) -> bool {
        match operation {
            Operation::Predict => self.predict,
            Operation::Rank => self.rank,
        }
    }
}

/// Capability errors: the algorithm does not implement the operation.
#[derive(Debug, Fail, Clone, PartialEq, Eq)]
pub enum AlgorithmError {
    /// Score prediction is not supported.
    #[fail(display = "{} is not a score prediction algorithm", _0)]
    NotPredictionAlgorithm(String),
    /// Ranking is not supported.
    #[fail(display = "{} is not a ranking algorithm", _0)]
    NotRankingAlgorithm(String),
}

/// A recommendation algorithm working on a graph of users and items.
///
/// Implementors declare what they support through `capabilities` and must
/// override every method whose operation they declare. The default
/// `predict` and `rank` always report a capability error, whatever
/// `capabilities` says. Callers dispatching on an unknown algorithm should
/// run [`check_capability`] first.
pub trait GraphBasedAlgorithm: fmt::Display {
    /// Filtering settings.
    fn config(&self) -> &GraphAlgorithmConfig;

    /// Supported operations.
    fn capabilities(&self) -> Capabilities;

    /// Predict the score each user would give to their candidate items.
    ///
    /// Users with an entry in `filter` are scored on those nodes only;
    /// other users are scored on every node they do not already link to.
    ///
    /// Must be overridden when `capabilities().predict` is set.
    fn predict(
        &self,
        _users: &[UserId],
        _graph: &dyn Graph,
        _filter: Option<&CandidateFilter>,
    ) -> Result<Vec<Interaction>, AlgorithmError> {
        Err(AlgorithmError::NotPredictionAlgorithm(self.to_string()))
    }

    /// Rank the candidate items of each user, best first, keeping the top
    /// `recs_number` per user if given. Candidates are chosen as in
    /// `predict`.
    ///
    /// Must be overridden when `capabilities().rank` is set.
    fn rank(
        &self,
        _users: &[UserId],
        _graph: &dyn Graph,
        _recs_number: Option<usize>,
        _filter: Option<&CandidateFilter>,
    ) -> Result<Vec<Interaction>, AlgorithmError> {
        Err(AlgorithmError::NotRankingAlgorithm(self.to_string()))
    }

    /// Filter raw results with this algorithm's settings.
    fn filter_result(
        &self,
        graph: &dyn Graph,
        result: HashMap<Node, f32>,
        filter_list: Option<&HashSet<Node>>,
        user_node: &Node,
    ) -> HashMap<Node, f32> {
        self.config()
            .filter_result(graph, result, filter_list, user_node)
    }
}

/// Fail with the matching capability error unless `algorithm` supports
/// `operation`.
pub fn check_capability<A: GraphBasedAlgorithm + ?Sized>(
    algorithm: &A,
    operation: Operation,
) -> Result<(), AlgorithmError> {
    if algorithm.capabilities().supports(operation) {
        return Ok(());
    }

    Err(match operation {
        Operation::Predict => AlgorithmError::NotPredictionAlgorithm(algorithm.to_string()),
        Operation::Rank => AlgorithmError::NotRankingAlgorithm(algorithm.to_string()),
    })
}

/// Sort scored nodes best first and keep at most `recs_number` of them.
/// Ties are broken by node to keep the output deterministic.
pub fn top_n(result: HashMap<Node, f32>, recs_number: Option<usize>) -> Vec<(Node, f32)> {
    let mut ranked: Vec<_> = result.into_iter().collect();

    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    if let Some(recs_number) = recs_number {
        ranked.truncate(recs_number);
    }

    ranked
}

/// Turn scored nodes into interactions of `user_id`, keyed by node id.
pub fn to_interactions<I>(user_id: &str, scored: I) -> Vec<Interaction>
where
    I: IntoIterator<Item = (Node, f32)>,
{
    scored
        .into_iter()
        .map(|(node, score)| Interaction::new(user_id, node.id(), score))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph::InteractionGraph;

    fn item(id: &str) -> Node {
        Node::Item(id.to_owned())
    }

    fn user(id: &str) -> Node {
        Node::User(id.to_owned())
    }

    fn graph() -> InteractionGraph {
        let mut graph = InteractionGraph::new();
        graph.add_link(user("u1"), item("i1"), 0.2);
        graph.add_link(user("u1"), item("i4"), 0.4);
        graph.add_link(user("u2"), item("i2"), 1.0);
        graph.add_link(user("u3"), item("i1"), 0.7);
        graph
    }

    fn raw_result() -> HashMap<Node, f32> {
        let mut result = HashMap::new();
        result.insert(item("i1"), 0.9);
        result.insert(item("i2"), 0.5);
        result.insert(user("u3"), 0.1);
        result
    }

    /// Ranks a fixed set of scores for every user.
    struct FixedScores {
        config: GraphAlgorithmConfig,
        scores: HashMap<Node, f32>,
    }

    impl fmt::Display for FixedScores {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "FixedScores")
        }
    }

    impl GraphBasedAlgorithm for FixedScores {
        fn config(&self) -> &GraphAlgorithmConfig {
            &self.config
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities {
                predict: false,
                rank: true,
            }
        }

        fn rank(
            &self,
            users: &[UserId],
            graph: &dyn Graph,
            recs_number: Option<usize>,
            filter: Option<&CandidateFilter>,
        ) -> Result<Vec<Interaction>, AlgorithmError> {
            let mut ranking = Vec::new();

            for user_id in users {
                let filter_list = filter.and_then(|filter| filter.get(user_id));
                let result = self.filter_result(
                    graph,
                    self.scores.clone(),
                    filter_list,
                    &Node::User(user_id.clone()),
                );

                ranking.extend(to_interactions(user_id, top_n(result, recs_number)));
            }

            Ok(ranking)
        }
    }

    fn fixed_scores() -> FixedScores {
        let mut scores = raw_result();
        scores.insert(item("i3"), 0.7);
        scores.insert(item("i4"), 0.3);

        FixedScores {
            config: GraphAlgorithmConfig::default(),
            scores,
        }
    }

    #[test]
    fn profile_weights() {
        let profile = extract_profile(&graph(), "u1");

        assert_eq!(profile.len(), 2);
        assert_eq!(profile[&item("i1")], 0.2);
        assert_eq!(profile[&item("i4")], 0.4);
    }

    #[test]
    fn profile_of_missing_user() {
        assert!(extract_profile(&graph(), "nobody").is_empty());
    }

    #[test]
    fn profile_only_contains_successors() {
        let graph = graph();
        let successors: HashSet<_> = graph.successors(&user("u3")).into_iter().collect();

        for node in extract_profile(&graph, "u3").keys() {
            assert!(successors.contains(node));
        }
    }

    #[test]
    fn filter_excludes_profile_and_other_kinds() {
        let config = GraphAlgorithmConfig::default();

        let filtered = config.filter_result(&graph(), raw_result(), None, &user("u1"));

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[&item("i2")], 0.5);
    }

    #[test]
    fn filter_with_extra_kinds() {
        let config = GraphAlgorithmConfig::default().keep(NodeKind::User);

        let filtered = config.filter_result(&graph(), raw_result(), None, &user("u1"));

        let mut keys: Vec<_> = filtered.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec![user("u3"), item("i2")]);
    }

    #[test]
    fn filter_list_takes_precedence() {
        let config = GraphAlgorithmConfig::default();
        let filter_list: HashSet<_> = vec![item("i1"), item("i2"), item("i9")]
            .into_iter()
            .collect();

        let filtered = config.filter_result(&graph(), raw_result(), Some(&filter_list), &user("u1"));

        let mut keys: Vec<_> = filtered.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec![item("i1"), item("i2")]);
        assert_eq!(filtered[&item("i1")], 0.9);
    }

    #[test]
    fn filter_result_is_subset_of_input() {
        let config = GraphAlgorithmConfig::new(vec![NodeKind::Item, NodeKind::User]);
        let input = raw_result();

        let filtered = config.filter_result(&graph(), input.clone(), None, &user("u9"));

        for node in filtered.keys() {
            assert!(input.contains_key(node));
        }
        assert_eq!(filtered.len(), 3);
    }

    #[test]
    fn top_n_ordering() {
        let ranked = top_n(raw_result(), Some(2));

        assert_eq!(ranked, vec![(item("i1"), 0.9), (item("i2"), 0.5)]);
        assert_eq!(top_n(raw_result(), None).len(), 3);
    }

    #[test]
    fn capabilities_are_checked() {
        let algorithm = fixed_scores();

        assert!(check_capability(&algorithm, Operation::Rank).is_ok());
        assert_eq!(
            check_capability(&algorithm, Operation::Predict).unwrap_err(),
            AlgorithmError::NotPredictionAlgorithm("FixedScores".to_owned())
        );
        assert_eq!(
            algorithm
                .predict(&["u1".to_owned()], &graph(), None)
                .unwrap_err(),
            AlgorithmError::NotPredictionAlgorithm("FixedScores".to_owned())
        );
    }

    #[test]
    fn declared_capabilities_are_implemented() {
        let algorithm = fixed_scores();
        let users = vec!["u1".to_owned()];
        let graph = graph();

        let predicted = algorithm.predict(&users, &graph, None);
        let ranked = algorithm.rank(&users, &graph, None, None);

        assert_eq!(
            check_capability(&algorithm, Operation::Predict).is_ok(),
            predicted.is_ok()
        );
        assert_eq!(
            check_capability(&algorithm, Operation::Rank).is_ok(),
            ranked.is_ok()
        );
    }

    #[test]
    fn rank_skips_already_linked_items() {
        let algorithm = fixed_scores();
        let users = vec!["u1".to_owned(), "u2".to_owned()];

        let ranking = algorithm.rank(&users, &graph(), Some(2), None).unwrap();

        let u1: Vec<_> = ranking
            .iter()
            .filter(|x| x.user_id() == "u1")
            .map(|x| x.item_id())
            .collect();
        let u2: Vec<_> = ranking
            .iter()
            .filter(|x| x.user_id() == "u2")
            .map(|x| x.item_id())
            .collect();

        assert_eq!(u1, vec!["i3", "i2"]);
        assert_eq!(u2, vec!["i1", "i3"]);
    }

    #[test]
    fn rank_with_candidate_filter() {
        let algorithm = fixed_scores();
        let mut filter = CandidateFilter::new();
        filter.insert(
            "u1".to_owned(),
            vec![item("i1"), item("i4")].into_iter().collect(),
        );

        let ranking = algorithm
            .rank(&["u1".to_owned()], &graph(), None, Some(&filter))
            .unwrap();

        let items: Vec<_> = ranking.iter().map(|x| x.item_id()).collect();
        assert_eq!(items, vec!["i1", "i4"]);
    }
}
