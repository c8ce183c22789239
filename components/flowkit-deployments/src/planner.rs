use std::collections::{HashMap, HashSet};

use flowkit_files::{paths, DeploymentContract};

use crate::program::Program;
use crate::DeploymentError;

/// Orders `contracts` so that every contract comes after the contracts it
/// imports. Contracts that do not depend on each other keep their input order.
pub fn order_contracts<'a>(
    contracts: &'a [DeploymentContract],
    aliases: &HashMap<String, String>,
) -> Result<Vec<&'a DeploymentContract>, DeploymentError> {
    let mut seen_names = HashSet::new();
    for contract in contracts {
        if !seen_names.insert(contract.name.as_str()) {
            return Err(DeploymentError::DuplicateDeployment(contract.name.clone()));
        }
    }

    let mut lookup = HashMap::new();
    for (index, contract) in contracts.iter().enumerate() {
        lookup.insert(paths::clean(&contract.location), index);
        lookup.entry(contract.name.clone()).or_insert(index);
    }

    let mut graph = Graph::new();
    for (index, contract) in contracts.iter().enumerate() {
        graph.add_node(index);
        let program = Program::new(&contract.code, contract.args.clone(), &contract.location)?;
        for import in program.imports() {
            let absolute = paths::join(&paths::dir(&contract.location), &import);
            let dependency = lookup
                .get(&paths::clean(&absolute))
                .or_else(|| lookup.get(&import));
            match dependency {
                Some(dependency) => graph.add_directed_edge(index, *dependency),
                None if aliases.contains_key(&paths::clean(&absolute))
                    || aliases.contains_key(&import) =>
                {
                    continue
                }
                None => {
                    return Err(DeploymentError::ImportNotFound {
                        contract: contract.name.clone(),
                        import,
                    })
                }
            }
        }
    }

    let cycles = graph.strongly_connected_components();
    if !cycles.is_empty() {
        let cycles = cycles
            .into_iter()
            .map(|component| {
                component
                    .into_iter()
                    .map(|index| contracts[index].name.clone())
                    .collect()
            })
            .collect();
        return Err(DeploymentError::CyclicImport { cycles });
    }

    let mut walker = GraphWalker::new();
    Ok(walker
        .get_sorted_dependencies(&graph)
        .into_iter()
        .map(|index| &contracts[index])
        .collect())
}

struct Graph {
    adjacency_list: Vec<Vec<usize>>,
}

impl Graph {
    fn new() -> Self {
        Self {
            adjacency_list: Vec::new(),
        }
    }

    fn add_node(&mut self, _index: usize) {
        self.adjacency_list.push(vec![]);
    }

    fn add_directed_edge(&mut self, src_index: usize, dst_index: usize) {
        if let Some(list) = self.adjacency_list.get_mut(src_index) {
            if !list.contains(&dst_index) {
                list.push(dst_index);
            }
        }
    }

    fn nodes_count(&self) -> usize {
        self.adjacency_list.len()
    }

    /// Components with more than one node, or a node importing itself, in
    /// order of their lowest index.
    fn strongly_connected_components(&self) -> Vec<Vec<usize>> {
        let mut tarjan = Tarjan {
            graph: self,
            index: 0,
            indexes: vec![None; self.nodes_count()],
            low_links: vec![0; self.nodes_count()],
            stack: vec![],
            on_stack: vec![false; self.nodes_count()],
            components: vec![],
        };
        for node in 0..self.nodes_count() {
            if tarjan.indexes[node].is_none() {
                tarjan.visit(node);
            }
        }

        let mut cycles: Vec<Vec<usize>> = tarjan
            .components
            .into_iter()
            .filter(|component| {
                component.len() > 1 || self.adjacency_list[component[0]].contains(&component[0])
            })
            .map(|mut component| {
                component.sort_unstable();
                component
            })
            .collect();
        cycles.sort_by_key(|component| component[0]);
        cycles
    }
}

struct Tarjan<'a> {
    graph: &'a Graph,
    index: usize,
    indexes: Vec<Option<usize>>,
    low_links: Vec<usize>,
    stack: Vec<usize>,
    on_stack: Vec<bool>,
    components: Vec<Vec<usize>>,
}

impl<'a> Tarjan<'a> {
    fn visit(&mut self, node: usize) {
        self.indexes[node] = Some(self.index);
        self.low_links[node] = self.index;
        self.index += 1;
        self.stack.push(node);
        self.on_stack[node] = true;

        let graph = self.graph;
        for &neighbor in graph.adjacency_list[node].iter() {
            match self.indexes[neighbor] {
                None => {
                    self.visit(neighbor);
                    self.low_links[node] = self.low_links[node].min(self.low_links[neighbor]);
                }
                Some(index) if self.on_stack[neighbor] => {
                    self.low_links[node] = self.low_links[node].min(index);
                }
                Some(_) => {}
            }
        }

        if Some(self.low_links[node]) == self.indexes[node] {
            let mut component = vec![];
            while let Some(member) = self.stack.pop() {
                self.on_stack[member] = false;
                component.push(member);
                if member == node {
                    break;
                }
            }
            self.components.push(component);
        }
    }
}

struct GraphWalker {
    seen: HashSet<usize>,
}

impl GraphWalker {
    fn new() -> Self {
        Self {
            seen: HashSet::new(),
        }
    }

    /// Depth-first search producing a post-order sort
    fn get_sorted_dependencies(&mut self, graph: &Graph) -> Vec<usize> {
        let mut sorted_indexes = Vec::<usize>::new();
        for index in 0..graph.nodes_count() {
            self.sort_dependencies_recursion(index, graph, &mut sorted_indexes);
        }
        sorted_indexes
    }

    fn sort_dependencies_recursion(&mut self, index: usize, graph: &Graph, branch: &mut Vec<usize>) {
        if !self.seen.insert(index) {
            return;
        }
        for neighbor in graph.adjacency_list[index].iter() {
            self.sort_dependencies_recursion(*neighbor, graph, branch);
        }
        branch.push(index);
    }
}
