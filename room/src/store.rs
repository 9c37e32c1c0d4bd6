use log::debug;
use room_core::{AudioSource, Error, SourceId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How far from its parent a reply node is placed, on each axis.
pub const REPLY_OFFSET: f32 = 60.0;

/// A voice node on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceNode {
    pub id: SourceId,
    pub x: f32,
    pub y: f32,
    #[serde(alias = "audioUrl")]
    pub audio_url: String,
    /// Node this one replies to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<SourceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl VoiceNode {
    pub fn new(id: SourceId, x: f32, y: f32, audio_url: impl Into<String>) -> Self {
        Self {
            id,
            x,
            y,
            audio_url: audio_url.into(),
            parent: None,
            author: None,
        }
    }

    pub fn source(&self) -> AudioSource {
        AudioSource::new(self.id.clone(), self.x, self.y, self.audio_url.clone())
    }
}

/// Ordered collection of the canvas' voice nodes.
///
/// Owned by the session that uses it; there is no global instance. Order is
/// preserved and becomes the mixer's input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeStore {
    nodes: Vec<VoiceNode>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON array of nodes, as sent by the upstream or kept in a
    /// scene file.
    pub fn parse_nodes(json: &str) -> Result<Vec<VoiceNode>, Error> {
        serde_json::from_str(json)
            .map_err(|e| Error::InvalidSource(format!("bad node list: {}", e)))
    }

    /// Replace every node at once.
    pub fn replace_all(&mut self, nodes: Vec<VoiceNode>) {
        debug!("Node store replaced ({} -> {} nodes)", self.nodes.len(), nodes.len());
        self.nodes = nodes;
    }

    /// Insert `node`, or update the node with the same id in place.
    pub fn upsert(&mut self, node: VoiceNode) {
        match self.nodes.iter_mut().find(|n| n.id == node.id) {
            Some(existing) => *existing = node,
            None => self.nodes.push(node),
        }
    }

    pub fn remove(&mut self, id: &SourceId) -> Option<VoiceNode> {
        let index = self.nodes.iter().position(|n| &n.id == id)?;
        Some(self.nodes.remove(index))
    }

    /// Add a reply next to `parent`, bound to freshly recorded audio.
    pub fn add_reply(
        &mut self,
        parent: &SourceId,
        audio_url: impl Into<String>,
    ) -> Result<SourceId, Error> {
        let anchor = self
            .get(parent)
            .ok_or_else(|| Error::InvalidSource(format!("no node {} to reply to", parent)))?;

        let id = SourceId::new(format!("reply-{}", Uuid::new_v4()))?;
        let mut node = VoiceNode::new(
            id.clone(),
            anchor.x + REPLY_OFFSET,
            anchor.y + REPLY_OFFSET,
            audio_url,
        );
        node.parent = Some(parent.clone());
        self.nodes.push(node);
        Ok(id)
    }

    pub fn get(&self, id: &SourceId) -> Option<&VoiceNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VoiceNode> + '_ {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Mixer input, in store order.
    pub fn sources(&self) -> Vec<AudioSource> {
        self.nodes.iter().map(VoiceNode::source).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, x: f32, y: f32) -> VoiceNode {
        VoiceNode::new(SourceId::new(id).unwrap(), x, y, format!("{}.wav", id))
    }

    #[test]
    fn upsert_updates_in_place() {
        let mut store = NodeStore::new();
        store.upsert(node("a", 0.0, 0.0));
        store.upsert(node("b", 1.0, 1.0));
        store.upsert(node("a", 5.0, 5.0));

        let ids: Vec<&str> = store.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(store.get(&SourceId::new("a").unwrap()).unwrap().x, 5.0);
    }

    #[test]
    fn remove_returns_node() {
        let mut store = NodeStore::new();
        store.upsert(node("a", 0.0, 0.0));
        let a = SourceId::new("a").unwrap();

        assert_eq!(store.remove(&a).map(|n| n.id), Some(a.clone()));
        assert!(store.remove(&a).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn reply_is_placed_next_to_parent() {
        let mut store = NodeStore::new();
        store.upsert(node("root", 100.0, 200.0));
        let root = SourceId::new("root").unwrap();

        let reply_id = store.add_reply(&root, "blob:fresh").unwrap();
        let reply = store.get(&reply_id).unwrap();

        assert!(reply_id.as_str().starts_with("reply-"));
        assert_eq!(reply.parent.as_ref(), Some(&root));
        assert_eq!((reply.x, reply.y), (160.0, 260.0));
        assert_eq!(reply.audio_url, "blob:fresh");
    }

    #[test]
    fn reply_to_missing_parent_fails() {
        let mut store = NodeStore::new();
        let err = store.add_reply(&SourceId::new("ghost").unwrap(), "blob:x");
        assert!(err.is_err());
    }

    #[test]
    fn parses_camel_case_audio_url() {
        let nodes = NodeStore::parse_nodes(
            r#"[{"id":"n1","x":1.5,"y":2,"audioUrl":"/audio/white_noise.wav"},
                {"id":"n2","x":0,"y":0,"audio_url":"b.wav","author":"sam"}]"#,
        )
        .unwrap();

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].audio_url, "/audio/white_noise.wav");
        assert_eq!(nodes[1].author.as_deref(), Some("sam"));
        assert!(NodeStore::parse_nodes(r#"[{"id":"","x":0,"y":0,"audio_url":"a"}]"#).is_err());
    }

    #[test]
    fn sources_follow_store_order() {
        let mut store = NodeStore::new();
        store.replace_all(vec![node("z", 0.0, 0.0), node("a", 1.0, 0.0)]);
        let ids: Vec<String> = store.sources().into_iter().map(|s| s.id.to_string()).collect();
        assert_eq!(ids, vec!["z", "a"]);
    }
}
