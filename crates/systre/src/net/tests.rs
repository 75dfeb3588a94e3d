use std::sync::OnceLock;

use super::*;
use crate::error::SystreError;
use crate::spacegroup::Catalogue;

const DIA_KEY: &str = "3 1 2 0 0 0 1 2 0 0 1 1 2 0 1 0 1 2 1 0 0";
const PCU_KEY: &str = "3 1 1 -1 0 0 1 1 0 -1 0 1 1 0 0 -1";

fn catalogue() -> &'static Catalogue {
    static CAT: OnceLock<Catalogue> = OnceLock::new();
    CAT.get_or_init(|| Catalogue::builtin().unwrap())
}

fn key_of(text: &str) -> String {
    parse_net(text, catalogue())
        .unwrap()
        .minimal_image()
        .unwrap()
        .systre_key()
        .unwrap()
}

#[test]
fn periodic_graph_blocks() {
    let text = "\
# the diamond net
PERIODIC_GRAPH
  ID \"diamond net\"
  EDGES
    a b  0 0 0
    a b  1 0 0   # comment
    a b  0 1 0
    a b  0 0 1
end
";
    let blocks = read_blocks(text);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].kind, Some(BlockKind::PeriodicGraph));
    assert_eq!(blocks[0].name().as_deref(), Some("diamond net"));
    assert_eq!(blocks[0].group(), "P1");
    let g = blocks[0].to_graph(catalogue()).unwrap();
    assert_eq!((g.number_of_nodes(), g.number_of_edges()), (2, 4));
    assert_eq!(g.systre_key().unwrap(), DIA_KEY);
}

#[test]
fn data_lines_continue_the_last_keyword() {
    // edge lines need no keyword only before any other keyword
    let bare = "PERIODIC_GRAPH\n  1 1 1 0 0\n  1 1 0 1 0\n  1 1 0 0 1\nEND\n";
    assert_eq!(key_of(bare), PCU_KEY);

    let after_name = "PERIODIC_GRAPH\n  NAME cubic\n  1 1 1 0 0\n  1 1 0 1 0\n  1 1 0 0 1\nEND\n";
    let blocks = read_blocks(after_name);
    assert_eq!(
        blocks[0].name().as_deref(),
        Some("cubic; 1 1 1 0 0; 1 1 0 1 0; 1 1 0 0 1")
    );
    assert!(blocks[0].to_graph(catalogue()).is_err());

    let with_edges = "PERIODIC_GRAPH\n  NAME cubic\n  EDGES\n  1 1 1 0 0\n  1 1 0 1 0\n  1 1 0 0 1\nEND\n";
    let blocks = read_blocks(with_edges);
    assert_eq!(blocks[0].name().as_deref(), Some("cubic"));
    let g = blocks[0].to_graph(catalogue()).unwrap();
    assert_eq!((g.number_of_nodes(), g.number_of_edges()), (1, 3));
    assert_eq!(g.systre_key().unwrap(), PCU_KEY);
}

#[test]
fn crystal_from_sites_only() {
    // nearest neighbours at distance 1
    let text = "\
CRYSTAL
  NAME dia
  GROUP Fd-3m
  CELL 2.3094 2.3094 2.3094 90 90 90
  NODE 1 4 1/8 1/8 1/8
END
";
    let g = parse_net(text, catalogue()).unwrap();
    assert_eq!(g.number_of_nodes(), 8);
    assert_eq!(g.number_of_edges(), 16);
    assert_eq!(key_of(text), DIA_KEY);
}

#[test]
fn crystal_with_explicit_edges() {
    let by_coords = "\
CRYSTAL
  GROUP Pm-3m
  CELL 1 1 1 90 90 90
  NODE V1 6 0 0 0
  EDGE 0 0 0 1 0 0
END";
    let by_name = "\
crystal
  group Pm-3m
  atom V1 6 0.0 0.0 0.0
  bond V1 0 0 1
end";
    for text in [by_coords, by_name] {
        let g = parse_net(text, catalogue()).unwrap();
        assert_eq!((g.number_of_nodes(), g.number_of_edges()), (1, 3));
        assert_eq!(g.systre_key().unwrap(), PCU_KEY);
    }
}

#[test]
fn plane_crystal() {
    let text = "\
CRYSTAL
  GROUP p6mm
  CELL 1.7320508 1.7320508 120
  NODE 1 3 1/3 2/3
END";
    let g = parse_net(text, catalogue()).unwrap();
    assert_eq!(g.dimension(), 2);
    assert_eq!((g.number_of_nodes(), g.number_of_edges()), (2, 3));
}

#[test]
fn errors_stay_inside_their_block() {
    let text = "\
CRYSTAL
  GROUP Pm-3m
  COLOUR red
END
PERIODIC_GRAPH
  1 1 1 0 0
  1 1 0 1 0
  1 1 0 0 1
END
TILING
END
PERIODIC_GRAPH
  1 2 0 0 0
";
    let blocks = read_blocks(text);
    assert_eq!(blocks.len(), 4);
    match blocks[0].to_graph(catalogue()) {
        Err(SystreError::Parse { line, msg }) => {
            assert_eq!(line, 3);
            assert!(msg.contains("COLOUR"));
        }
        other => panic!("expected a parse error, got {other:?}"),
    }
    assert_eq!(
        blocks[1].to_graph(catalogue()).unwrap().systre_key().unwrap(),
        PCU_KEY
    );
    assert!(blocks[2].to_graph(catalogue()).is_err());
    let err = blocks[3].to_graph(catalogue()).unwrap_err();
    assert!(err.to_string().contains("end of file"));
    assert_eq!(err.category(), crate::error::Category::File);
}

#[test]
fn bad_crystal_input() {
    let cases = [
        "CRYSTAL\n GROUP Xyz\n NODE 1 4 0 0 0\nEND",
        "CRYSTAL\n NODE 1 0 0 0 0\nEND",
        "CRYSTAL\n NODE 1 4 0 0\nEND",
        "CRYSTAL\n CELL 1 1 1 90 90\n NODE 1 4 0 0 0\nEND",
        "CRYSTAL\n NODE 1 6 0 0 0\n NODE 2 6 0 0 0.0001\nEND",
        "CRYSTAL\n NODE 1 6 0 0 0\n EDGE 1 2\nEND",
        "PERIODIC_GRAPH\n 1 1 0 0 0\nEND",
        "PERIODIC_GRAPH\n 1 2 0 0 0\n 1 2 0 0\nEND",
    ];
    for text in cases {
        assert!(
            matches!(parse_net(text, catalogue()), Err(SystreError::Parse { .. })),
            "{text}"
        );
    }
}

#[test]
fn crystal_block_reads_back() {
    let block = CrystalBlock {
        name: "simple cubic".into(),
        group: "Pm-3m".into(),
        lengths: vec![1.0, 1.0, 1.0],
        angles: vec![90.0, 90.0, 90.0],
        nodes: vec![CrystalNode {
            name: "1".into(),
            degree: 6,
            position: vec![0.0, 0.0, -0.0],
        }],
        edges: vec![(vec![0.0, 0.0, 0.0], vec![0.0, 0.0, 1.0])],
        edge_centers: vec![vec![0.0, 0.0, 0.5]],
    };
    let text = block.to_string();
    assert!(text.starts_with("CRYSTAL\n  NAME \"simple cubic\"\n  GROUP Pm-3m\n"));
    assert!(text.contains("  CELL 1.00000 1.00000 1.00000 90.0000 90.0000 90.0000\n"));
    assert!(text.contains("  NODE 1 6  0.00000 0.00000 0.00000\n"));
    assert!(text.contains("# EDGE_CENTER  0.00000 0.00000 0.50000\n"));
    assert!(text.ends_with("END\n"));

    let blocks = read_blocks(&text);
    assert_eq!(blocks[0].name().as_deref(), Some("simple cubic"));
    assert_eq!(
        blocks[0].to_graph(catalogue()).unwrap().systre_key().unwrap(),
        PCU_KEY
    );
}

#[test]
fn number_formatting() {
    assert_eq!(fixed(-0.000001, 5), "0.00000");
    assert_eq!(fixed(-0.25, 4), "-0.2500");
    assert_eq!(fixed(1.0 / 3.0, 5), "0.33333");
    let g = gram_from_cell(&[1.0, 2.0, 3.0], &[90.0, 90.0, 90.0]).unwrap();
    assert!((g[(1, 1)] - 4.0).abs() < 1e-12);
    assert!(g[(0, 2)].abs() < 1e-12);
    let h = gram_from_cell(&[1.0, 1.0], &[120.0]).unwrap();
    assert!((h[(0, 1)] + 0.5).abs() < 1e-12);
    assert!(gram_from_cell(&[1.0], &[]).is_none());
}
