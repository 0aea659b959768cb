#[cfg(test)]
mod topology_tests {
    use collsim::topology::{
        construct_topology, export, AxisSpec, BasicTopology, MultiDimTopology, Topology,
        TopologyBuildingBlock, TopologyError,
    };

    const SHAPES: [TopologyBuildingBlock; 7] = [
        TopologyBuildingBlock::Ring,
        TopologyBuildingBlock::Mesh,
        TopologyBuildingBlock::FullyConnected,
        TopologyBuildingBlock::Switch,
        TopologyBuildingBlock::BinaryTree,
        TopologyBuildingBlock::DoubleBinaryTree,
        TopologyBuildingBlock::HyperCube,
    ];

    fn spec(block: TopologyBuildingBlock, npus_count: usize) -> AxisSpec {
        AxisSpec {
            block,
            npus_count,
            bandwidth: 50.0,
            latency: 500.0,
            bidirectional: true,
        }
    }

    /// Every route starts at src, ends at dst and only uses existing links
    fn assert_routes_follow_links(topology: &Topology) {
        let npus_count = topology.npus_count();
        for src in 0..npus_count {
            for dst in 0..npus_count {
                if src == dst {
                    continue;
                }
                let route = topology.route(src, dst).unwrap();
                assert_eq!(
                    route.first(),
                    Some(&src),
                    "{} route {}->{}",
                    topology.describe(),
                    src,
                    dst
                );
                assert_eq!(
                    route.last(),
                    Some(&dst),
                    "{} route {}->{}",
                    topology.describe(),
                    src,
                    dst
                );
                for hop in route.windows(2) {
                    assert!(
                        topology.links().is_connected(hop[0], hop[1]),
                        "{}: route {}->{} uses missing link {}->{}",
                        topology.describe(),
                        src,
                        dst,
                        hop[0],
                        hop[1]
                    );
                }
            }
        }
    }

    #[test]
    fn test_basic_routes_start_and_end_correctly() {
        for block in SHAPES {
            for npus_count in [2, 4, 8, 16] {
                let topology = construct_topology(&[spec(block, npus_count)]).unwrap();
                assert_routes_follow_links(&topology);
            }
        }
    }

    #[test]
    fn test_odd_sized_shapes() {
        for block in SHAPES {
            if block == TopologyBuildingBlock::HyperCube {
                continue;
            }
            for npus_count in [3, 5, 7, 11] {
                let topology = construct_topology(&[spec(block, npus_count)]).unwrap();
                assert_routes_follow_links(&topology);
            }
        }
    }

    #[test]
    fn test_hypercube_hop_count_is_popcount() {
        let topology = construct_topology(&[spec(TopologyBuildingBlock::HyperCube, 8)]).unwrap();
        assert_eq!(topology.hop_count(0, 7).unwrap(), 3);
        for src in 0..8usize {
            for dst in 0..8usize {
                if src != dst {
                    assert_eq!(
                        topology.hop_count(src, dst).unwrap(),
                        (src ^ dst).count_ones() as usize
                    );
                }
            }
        }
    }

    #[test]
    fn test_hypercube_requires_power_of_two() {
        assert!(matches!(
            construct_topology(&[spec(TopologyBuildingBlock::HyperCube, 6)]),
            Err(TopologyError::NotPowerOfTwo { .. })
        ));
    }

    #[test]
    fn test_double_binary_tree_never_longer() {
        for npus_count in [2, 4, 8, 16] {
            let single =
                BasicTopology::build(&spec(TopologyBuildingBlock::BinaryTree, npus_count), false)
                    .unwrap();
            let double = BasicTopology::build(
                &spec(TopologyBuildingBlock::DoubleBinaryTree, npus_count),
                false,
            )
            .unwrap();
            for src in 0..npus_count {
                for dst in 0..npus_count {
                    if src != dst {
                        assert!(
                            double.hop_count(src, dst).unwrap()
                                <= single.hop_count(src, dst).unwrap()
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_multi_dim_address_round_trip() {
        let topology = construct_topology(&[
            spec(TopologyBuildingBlock::Ring, 2),
            spec(TopologyBuildingBlock::Mesh, 8),
            spec(TopologyBuildingBlock::FullyConnected, 4),
        ])
        .unwrap();
        let Topology::MultiDim(multi_dim) = &topology else {
            panic!("expected a multi-dimensional topology");
        };

        assert_eq!(multi_dim.translate_address(47).unwrap(), vec![1, 7, 2]);
        for id in 0..multi_dim.npus_count() {
            let address = multi_dim.translate_address(id).unwrap();
            assert_eq!(multi_dim.translate_address_back(&address).unwrap(), id);
        }
    }

    #[test]
    fn test_multi_dim_routes_follow_links() {
        let shapes = [
            vec![
                spec(TopologyBuildingBlock::Ring, 4),
                spec(TopologyBuildingBlock::Ring, 4),
            ],
            vec![
                spec(TopologyBuildingBlock::Switch, 4),
                spec(TopologyBuildingBlock::Ring, 2),
            ],
            vec![
                spec(TopologyBuildingBlock::HyperCube, 4),
                spec(TopologyBuildingBlock::Mesh, 3),
                spec(TopologyBuildingBlock::FullyConnected, 2),
            ],
            vec![
                spec(TopologyBuildingBlock::BinaryTree, 5),
                spec(TopologyBuildingBlock::Switch, 3),
            ],
        ];
        for dims in shapes {
            let topology = construct_topology(&dims).unwrap();
            assert_routes_follow_links(&topology);
        }
    }

    #[test]
    fn test_multi_dim_hop_count_adds_up_per_dimension() {
        let mut multi_dim = MultiDimTopology::new();
        multi_dim.append_dimension(
            BasicTopology::build(&spec(TopologyBuildingBlock::Ring, 4), true).unwrap(),
        );
        multi_dim.append_dimension(
            BasicTopology::build(&spec(TopologyBuildingBlock::HyperCube, 4), true).unwrap(),
        );
        multi_dim.initialize_all_devices();
        multi_dim.make_connections().unwrap();

        // id 7 = [3, 1]: one ring hop back, one hypercube hop
        assert_eq!(multi_dim.translate_address(7).unwrap(), vec![3, 1]);
        assert_eq!(multi_dim.hop_count(0, 7).unwrap(), 2);
        // id 13 = [1, 3]: one ring hop, two hypercube hops
        assert_eq!(multi_dim.hop_count(0, 13).unwrap(), 3);
        assert_eq!(multi_dim.dim_to_transfer(0, 7).unwrap(), 0);
        assert_eq!(multi_dim.dim_to_transfer(0, 8).unwrap(), 1);
    }

    #[test]
    fn test_ns3_export_counts() {
        let topology = construct_topology(&[spec(TopologyBuildingBlock::Switch, 4)]).unwrap();
        let text = export::to_ns3(&topology);
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("5 1 4"));
        assert_eq!(lines.next(), Some("4"));
        assert_eq!(lines.count(), 4);
    }
}
