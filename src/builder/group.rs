use crate::typed::Handler;
use std::sync::Arc;

/// An operation registration: its id, its own middlewares and its terminal handler.
#[derive(Clone)]
pub(crate) struct OperationEntry {
    pub(crate) id: String,
    pub(crate) middlewares: Vec<Arc<dyn Handler>>,
    pub(crate) terminal: Arc<dyn Handler>,
}

/// A flattened chain ready for validation and compilation.
pub(crate) struct FlatOperation {
    pub(crate) id: String,
    /// Middlewares outermost first, terminal handler last.
    pub(crate) chain: Vec<Arc<dyn Handler>>,
}

#[derive(Clone)]
enum Member {
    Operation(OperationEntry),
    Group(Group),
}

/// A set of operations and nested groups sharing middlewares.
///
/// ```rust,ignore
/// let admin = Group::new()
///     .use_middleware(require_admin)
///     .with_operation("deleteUser", delete_user, vec![])
///     .with_group(Group::new().use_middleware(audit).with_operation("purge", purge, vec![]));
/// ```
#[derive(Clone, Default)]
pub struct Group {
    middlewares: Vec<Arc<dyn Handler>>,
    members: Vec<Member>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware applied to every operation of this group.
    pub fn use_middleware(mut self, middleware: Arc<dyn Handler>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn with_operation(
        mut self,
        id: impl Into<String>,
        terminal: Arc<dyn Handler>,
        middlewares: Vec<Arc<dyn Handler>>,
    ) -> Self {
        self.members.push(Member::Operation(OperationEntry {
            id: id.into(),
            middlewares,
            terminal,
        }));
        self
    }

    pub fn with_group(mut self, group: Group) -> Self {
        self.members.push(Member::Group(group));
        self
    }

    pub(crate) fn push_middleware(&mut self, middleware: Arc<dyn Handler>) {
        self.middlewares.push(middleware);
    }

    pub(crate) fn push_operation(&mut self, entry: OperationEntry) {
        self.members.push(Member::Operation(entry));
    }

    pub(crate) fn push_group(&mut self, group: Group) {
        self.members.push(Member::Group(group));
    }

    /// Every operation in registration order with its full chain.
    pub(crate) fn flatten(&self) -> Vec<FlatOperation> {
        let mut out = Vec::new();
        self.flatten_into(&[], &mut out);
        out
    }

    fn flatten_into(&self, outer: &[Arc<dyn Handler>], out: &mut Vec<FlatOperation>) {
        let mut inherited = outer.to_vec();
        inherited.extend(self.middlewares.iter().cloned());
        for member in &self.members {
            match member {
                Member::Operation(entry) => {
                    let mut chain = inherited.clone();
                    chain.extend(entry.middlewares.iter().cloned());
                    chain.push(Arc::clone(&entry.terminal));
                    out.push(FlatOperation {
                        id: entry.id.clone(),
                        chain,
                    });
                }
                Member::Group(group) => group.flatten_into(&inherited, out),
            }
        }
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("middlewares", &self.middlewares.len())
            .field("members", &self.members.len())
            .finish()
    }
}
