use std::collections::HashMap;

/// Level separator in realtime event names (`follow:responded`).
pub const SEPARATOR: char = ':';

/// Event-name pattern trie with MQTT-style wildcards.
///
/// - `+` matches exactly one level
/// - `#` matches zero or more trailing levels (last segment only)
///
/// ```ignore
/// let mut trie = EventTrie::new();
/// trie.insert("notification", 1);
/// trie.insert("notification:#", 2);
/// trie.insert("+:responded", 3);
///
/// assert_eq!(trie.matches("notification"), vec![&1, &2]);
/// assert_eq!(trie.matches("follow:responded"), vec![&3]);
/// ```
pub struct EventTrie<T> {
    root: Node<T>,
}

struct Node<T> {
    children: HashMap<String, Node<T>>,
    single: Option<Box<Node<T>>>,
    /// Values registered with a trailing `#` at this level.
    rest: Vec<T>,
    values: Vec<T>,
}

impl<T> Node<T> {
    fn new() -> Self {
        Self {
            children: HashMap::new(),
            single: None,
            rest: Vec::new(),
            values: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.values.is_empty()
            && self.rest.is_empty()
            && self.single.is_none()
            && self.children.is_empty()
    }
}

impl<T> EventTrie<T> {
    pub fn new() -> Self {
        Self { root: Node::new() }
    }

    pub fn insert(&mut self, pattern: &str, value: T) {
        let mut node = &mut self.root;
        for segment in levels(pattern) {
            node = match segment {
                "#" => {
                    node.rest.push(value);
                    return;
                }
                "+" => &mut **node.single.get_or_insert_with(|| Box::new(Node::new())),
                exact => node.children.entry(exact.to_string()).or_insert_with(Node::new),
            };
        }
        node.values.push(value);
    }

    /// Values whose pattern matches the concrete event name, in
    /// exact → `+` → `#` order per level.
    pub fn matches(&self, name: &str) -> Vec<&T> {
        let segments: Vec<&str> = levels(name).collect();
        let mut out = Vec::new();
        collect(&self.root, &segments, &mut out);
        out
    }

    /// Remove values registered under `pattern` that satisfy `pred`.
    /// Empty branches are pruned. Returns the number removed.
    pub fn remove<F>(&mut self, pattern: &str, pred: F) -> usize
    where
        F: Fn(&T) -> bool,
    {
        let segments: Vec<&str> = levels(pattern).collect();
        remove_at(&mut self.root, &segments, &pred)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

impl<T> Default for EventTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn levels(s: &str) -> impl Iterator<Item = &str> {
    s.split(SEPARATOR).filter(|seg| !seg.is_empty())
}

fn collect<'a, T>(node: &'a Node<T>, segments: &[&str], out: &mut Vec<&'a T>) {
    let Some((first, tail)) = segments.split_first() else {
        out.extend(node.values.iter());
        out.extend(node.rest.iter());
        return;
    };
    if let Some(child) = node.children.get(*first) {
        collect(child, tail, out);
    }
    if let Some(single) = &node.single {
        collect(single, tail, out);
    }
    out.extend(node.rest.iter());
}

fn remove_at<T, F>(node: &mut Node<T>, segments: &[&str], pred: &F) -> usize
where
    F: Fn(&T) -> bool,
{
    let Some((first, tail)) = segments.split_first() else {
        let before = node.values.len();
        node.values.retain(|v| !pred(v));
        return before - node.values.len();
    };
    match *first {
        "#" => {
            let before = node.rest.len();
            node.rest.retain(|v| !pred(v));
            before - node.rest.len()
        }
        "+" => {
            let Some(single) = node.single.as_mut() else {
                return 0;
            };
            let removed = remove_at(single, tail, pred);
            if single.is_empty() {
                node.single = None;
            }
            removed
        }
        exact => {
            let Some(child) = node.children.get_mut(exact) else {
                return 0;
            };
            let removed = remove_at(child, tail, pred);
            if child.is_empty() {
                node.children.remove(exact);
            }
            removed
        }
    }
}
