//! Drug → target → pathway association graph.

use pathmind_common::entities::{
    AssociationGraph, CompoundIdentity, EdgeKind, GraphEdge, GraphNode, NodeKind, PathwayScore, TargetHit,
};
use serde_json::json;

/// One drug node, one node per target and pathway, `drug_target` edges
/// weighted by median potency and `target_pathway` edges weighted by score.
pub fn build_graph(identity: &CompoundIdentity, targets: &[TargetHit], pathways: &[PathwayScore]) -> AssociationGraph {
    let drug_id = format!("drug:{}", identity.chembl_parent_id);
    let mut nodes = vec![GraphNode {
        id: drug_id.clone(),
        label: identity.display_name.clone(),
        kind: NodeKind::Drug,
        metadata: json!({ "chembl_id": identity.chembl_parent_id }),
    }];
    let mut edges = Vec::with_capacity(targets.len());

    for target in targets {
        let target_id = format!("target:{}", target.target_chembl_id);
        nodes.push(GraphNode {
            id: target_id.clone(),
            label: target.target_name.clone(),
            kind: NodeKind::Target,
            metadata: json!({
                "pchembl": target.median_pchembl,
                "confidence_tier": target.confidence_tier,
                "action_type": target.action_type,
                "uniprot_id": target.uniprot_id,
                "mapping_status": target.mapping_status,
                "mapping_notes": target.mapping_notes,
                "assay_range": {
                    "min": target.pchembl_min,
                    "max": target.pchembl_max,
                    "iqr": target.pchembl_iqr,
                },
            }),
        });
        edges.push(GraphEdge {
            id: format!("edge:drug:{}", target.target_chembl_id),
            source: drug_id.clone(),
            target: target_id,
            kind: EdgeKind::DrugTarget,
            weight: target.median_pchembl,
            metadata: json!({ "action_type": target.action_type }),
        });
    }

    for pathway in pathways {
        nodes.push(GraphNode {
            id: format!("pathway:{}", pathway.pathway_id),
            label: pathway.pathway_name.clone(),
            kind: NodeKind::Pathway,
            metadata: json!({
                "score": pathway.score,
                "reactome_url": pathway.url,
                "coverage_ratio": pathway.coverage_ratio,
                "source": "reactome",
            }),
        });
    }

    for pathway in pathways {
        for target_id in &pathway.target_ids {
            edges.push(GraphEdge {
                id: format!("edge:{}:{}", target_id, pathway.pathway_id),
                source: format!("target:{target_id}"),
                target: format!("pathway:{}", pathway.pathway_id),
                kind: EdgeKind::TargetPathway,
                weight: pathway.score,
                metadata: json!({}),
            });
        }
    }

    AssociationGraph { nodes, edges }
}
