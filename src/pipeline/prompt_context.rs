//! System prompt assembly from the reference store.

use chrono::{DateTime, Utc};
use handlebars::Handlebars;
use serde::Serialize;
use serde_json::json;

/// Reference material injected into the system prompt.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReferenceDocument {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub usage_prompt: Option<String>,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub embedding_processed: bool,
    pub created_at: DateTime<Utc>,
}

impl ReferenceDocument {
    pub fn is_usable(&self) -> bool {
        self.is_active && self.embedding_processed
    }
}

const PREAMBLE: &str = "Tu es un assistant cartographique expert de la région Bourgogne-Franche-Comté. \
Tu produis des données géographiques exploitables directement sur une carte interactive.";

const DOCUMENT_BLOCK: &str = "### Document : {{name}}
Description : {{description}}
Utilisation : {{usage_prompt}}
Tags : {{tags}}
";

/// Appended verbatim after the documents; keeps the answer region-locked and parseable.
pub const FORMAT_RULES: &str = r##"## Règles impératives
1. Zone géographique : uniquement la région Bourgogne-Franche-Comté (latitude entre 46.0 et 48.5, longitude entre 2.5 et 7.5). Ne produis jamais de point hors de cette zone.
2. Réponds avec UN SEUL objet JSON valide, sans texte avant ni après, sans commentaire.
3. Le champ "type" est obligatoire et vaut "geocodage", "choroplèthe" ou "complexe".
4. Forme "geocodage" : {"type":"geocodage","title":"...","description":"...","locations":[{"address":"...","latitude":47.0,"longitude":5.0,"codeINSEE":"21231","properties":{}}]}
5. Forme "choroplèthe" : {"type":"choroplèthe","title":"...","description":"...","dataLevel":"communes|epci|departements","colors":["#f7fbff","#08306b"],"joinKey":"code"}
6. Forme "complexe" : {"type":"complexe","title":"...","description":"...","layers":[{"name":"...","type":"geocodage|choroplèthe","data":{}}]}
7. Les coordonnées sont en degrés décimaux WGS84. Les codes INSEE sont des chaînes de 5 caractères.
8. Si une information manque, laisse le champ vide plutôt que d'inventer une valeur."##;

/// Deterministic context order: creation time ascending, ties broken by id.
pub fn order_documents(documents: &mut [ReferenceDocument]) {
    documents.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}

fn render_block(handlebars: &Handlebars<'_>, document: &ReferenceDocument) -> String {
    let data = json!({
        "name": document.name,
        "description": document.description.as_deref().unwrap_or(""),
        "usage_prompt": document.usage_prompt.as_deref().unwrap_or(""),
        "tags": document.tags.join(", "),
    });

    handlebars
        .render_template(DOCUMENT_BLOCK, &data)
        .unwrap_or_else(|err| {
            tracing::warn!(document = %document.name, error = %err, "Failed to render document block");
            format!("### Document : {}\n", document.name)
        })
}

/// Build the system prompt from the usable reference documents, in the order given.
pub fn build_system_prompt(documents: &[ReferenceDocument]) -> String {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    let blocks: Vec<String> = documents
        .iter()
        .filter(|document| document.is_usable())
        .map(|document| render_block(&handlebars, document))
        .collect();

    let mut prompt = String::new();
    prompt.push_str(PREAMBLE);
    prompt.push_str("\n\n");

    if !blocks.is_empty() {
        prompt.push_str("## Documents de référence\n\n");
        prompt.push_str(&blocks.join("\n"));
        prompt.push('\n');
    }

    prompt.push_str(FORMAT_RULES);

    tracing::debug!(
        documents = blocks.len(),
        chars = prompt.len(),
        "Built system prompt"
    );

    prompt
}

pub fn build_user_prompt(prompt: &str) -> String {
    format!(
        "Demande de l'utilisateur : {}\n\nRéponds uniquement avec l'objet JSON demandé.",
        prompt.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn document(id: i32, name: &str, active: bool, processed: bool, day: u32) -> ReferenceDocument {
        ReferenceDocument {
            id,
            name: name.to_string(),
            description: Some(format!("{} description", name)),
            usage_prompt: Some("Utiliser pour les communes".to_string()),
            tags: vec!["communes".to_string(), "insee".to_string()],
            is_active: active,
            embedding_processed: processed,
            created_at: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn renders_usable_documents_with_rules_suffix() {
        let prompt = build_system_prompt(&[
            document(1, "Communes BFC", true, true, 1),
            document(2, "Inactive", false, true, 2),
            document(3, "Pending", true, false, 3),
        ]);

        assert!(prompt.contains("### Document : Communes BFC\nDescription : Communes BFC description\n"));
        assert!(prompt.contains("Tags : communes, insee"));
        assert!(!prompt.contains("Inactive"));
        assert!(!prompt.contains("Pending"));
        assert!(prompt.ends_with(FORMAT_RULES));
    }

    #[test]
    fn rules_spell_out_the_choroplethe_shape() {
        assert!(FORMAT_RULES.contains(
            r##"5. Forme "choroplèthe" : {"type":"choroplèthe","title":"...","description":"...","dataLevel":"communes|epci|departements","colors":["#f7fbff","#08306b"],"joinKey":"code"}"##
        ));
        assert!(FORMAT_RULES.ends_with("plutôt que d'inventer une valeur."));
    }

    #[test]
    fn special_characters_are_not_escaped() {
        let mut doc = document(1, "Eau & assainissement <2024>", true, true, 1);
        doc.description = None;
        let prompt = build_system_prompt(&[doc]);
        assert!(prompt.contains("Eau & assainissement <2024>"));
        assert!(prompt.contains("Description : \n"));
    }

    #[test]
    fn no_documents_still_carries_rules() {
        let prompt = build_system_prompt(&[]);
        assert!(!prompt.contains("Documents de référence"));
        assert!(prompt.ends_with(FORMAT_RULES));
    }

    #[test]
    fn ordering_is_by_creation_then_id() {
        let mut documents = vec![
            document(5, "late", true, true, 9),
            document(4, "tie-b", true, true, 2),
            document(3, "tie-a", true, true, 2),
        ];
        order_documents(&mut documents);
        let names: Vec<_> = documents.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["tie-a", "tie-b", "late"]);
    }
}
