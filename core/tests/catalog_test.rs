use std::io::Write;
use umi_assist_core::recommend::{format_recommendation, Recommendation};
use umi_assist_core::{ApiField, AssistError, Catalog};

const APIS_MD: &str = r#"# UMI API reference

### Req Issue
**Path:** /v1/issue
**Method:** POST
**Description:** Issue a new tokenized asset
**Fields:**
- name: id type: string description: Unique asset identifier
- name: value  type: string  description: Face value of the asset
- name: toWalletAddress type: string description: Receiving wallet

---

### Req Manage
**Path:** /v1/manage
**Method:** POST
**Description:** Burn or lock an existing asset
**Fields:**
- name: id type: string description: Asset to manage

---

### Req Settle
**Path:** /v1/settle
**Method:** POST
**Description:** Settle a trade between two parties
"#;

#[test]
fn loads_markdown_catalog_from_disk() {
    let mut file = tempfile::Builder::new().suffix(".md").tempfile().unwrap();
    file.write_all(APIS_MD.as_bytes()).unwrap();

    let catalog = Catalog::load(file.path()).unwrap();
    assert_eq!(catalog.len(), 3);

    let names: Vec<&str> = catalog.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["Req Issue", "Req Manage", "Req Settle"]);

    let issue = catalog.get(0).unwrap();
    assert_eq!(issue.fields.len(), 3);
    assert_eq!(
        issue.fields[2],
        ApiField::new("toWalletAddress", "string", "Receiving wallet")
    );
    assert!(catalog.get(2).unwrap().fields.is_empty());
}

#[test]
fn loads_json_catalog_from_disk() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"[{{"name": "Issue", "path": "/v1/issue", "method": "POST",
             "fields": [{{"name": "id", "type": "string", "description": "Asset id"}}]}}]"#
    )
    .unwrap();

    let catalog = Catalog::load(file.path()).unwrap();
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.get(0).unwrap().fields[0].field_type, "string");
}

#[test]
fn malformed_json_catalog_is_rejected() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, "{{ not a list").unwrap();
    assert!(matches!(Catalog::load(file.path()), Err(AssistError::Catalog(_))));
}

#[test]
fn rendered_recommendation_lists_selected_fields() {
    let catalog = Catalog::from_markdown(APIS_MD);
    let api = catalog.get(0).unwrap().clone();
    let rec = Recommendation {
        fields: vec![api.fields[0].clone(), api.fields[2].clone()],
        api,
        payload: "{\"payload\": {\"tokenizedAsset\": [{\"id\": \"A-1\"}]}}".into(),
        event_payload: String::new(),
    };

    let text = format_recommendation(&rec);
    assert!(text.starts_with("Recommended API:\n Name: Req Issue\n Path: /v1/issue\n Method: POST"));
    assert!(text.contains(" - id (string): Unique asset identifier\n - toWalletAddress (string): Receiving wallet"));
    assert!(text.ends_with("[{\"id\": \"A-1\"}]}}"));
}
