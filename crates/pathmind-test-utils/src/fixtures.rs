use pathmind_common::entities::{
    BioactivityRecord, CompoundCandidate, ConfidenceTier, MappingStatus, PathwayAssociation, TargetDetail,
    TargetHit, UNKNOWN_ACTION,
};

/// An activity that passes every assay filter at the default threshold.
pub fn activity(target_id: &str, pchembl: f64) -> BioactivityRecord {
    BioactivityRecord {
        target_id: Some(target_id.to_string()),
        pchembl: Some(pchembl),
        relation: Some("=".to_string()),
        assay_type: Some("B".to_string()),
        organism: Some("Homo sapiens".to_string()),
        data_validity_comment: None,
        assay_id: Some(format!("ASSAY-{}-{}", target_id, pchembl)),
    }
}

pub fn target_detail(name: &str, gene_symbol: &str, accession: &str, confidence: Option<u8>) -> TargetDetail {
    TargetDetail {
        target_name: Some(name.to_string()),
        gene_symbol: Some(gene_symbol.to_string()),
        uniprot_id: Some(accession.to_string()),
        confidence_score: confidence,
        organism: Some("Homo sapiens".to_string()),
    }
}

pub fn candidate(parent_id: &str, name: &str, inchikey: Option<&str>) -> CompoundCandidate {
    CompoundCandidate {
        chembl_parent_id: parent_id.to_string(),
        display_name: name.to_string(),
        canonical_inchikey: inchikey.map(String::from),
        structure_smiles: None,
        synonyms: vec![name.to_lowercase()],
        match_score: 1.0,
    }
}

pub fn pathway(id: &str, depth: u32, size: u32, ancestors: &[&str]) -> PathwayAssociation {
    PathwayAssociation {
        pathway_id: id.to_string(),
        pathway_name: format!("Pathway {}", id),
        depth,
        size,
        ancestor_ids: ancestors.iter().map(|a| a.to_string()).collect(),
        url: format!("https://reactome.org/content/detail/{}", id),
    }
}

/// A medium-confidence hit with no mapping applied yet.
pub fn target_hit(target_id: &str, median_pchembl: f64) -> TargetHit {
    TargetHit {
        target_chembl_id: target_id.to_string(),
        target_name: target_id.to_string(),
        gene_symbol: None,
        uniprot_id: None,
        action_type: UNKNOWN_ACTION.to_string(),
        median_pchembl,
        assay_count: 2,
        confidence_score: Some(8),
        confidence_tier: ConfidenceTier::Medium,
        low_confidence: false,
        source_assay_ids: vec![],
        pchembl_min: median_pchembl,
        pchembl_max: median_pchembl,
        pchembl_iqr: 0.0,
        confidence_reasons: vec![],
        mapping_status: MappingStatus::Unmapped,
        mapping_notes: vec![],
    }
}
