//! Multi-dimensional address math.
//!
//! NPU ids are mixed-radix numbers over the per-dimension NPU counts, with
//! dimension 0 as the least significant digit. Switch devices sit after all
//! NPUs; an address whose coordinate in a switch dimension equals that
//! dimension's NPU count names a switch.

use std::collections::BTreeMap;

use super::types::{ConnectionPolicy, DeviceId, MultiDimAddress, TopologyError};

/// `sum(address[d] * prod(shape[..d]))`
fn mixed_radix_offset(address: &[usize], shape: &[usize]) -> DeviceId {
    address
        .iter()
        .zip(shape)
        .rev()
        .fold(0, |id, (coordinate, size)| id * size + coordinate)
}

/// Maps switch addresses to global device ids.
///
/// Switches of each switch dimension form one contiguous block, blocks
/// ordered by dimension. Within a block a switch is identified by the
/// coordinates of the dimensions above it.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchTranslationUnit {
    total_npus_count: usize,
    npus_count_per_dim: Vec<usize>,
    is_switch_dim: Vec<bool>,
    /// Length of the higher-dimension suffix -> first switch offset
    offset_by_suffix_length: BTreeMap<usize, usize>,
    switches_count: usize,
}

impl SwitchTranslationUnit {
    pub fn new(npus_count_per_dim: Vec<usize>, is_switch_dim: Vec<bool>) -> Self {
        let dims_count = npus_count_per_dim.len();
        let total_npus_count = npus_count_per_dim.iter().product();

        let mut offset_by_suffix_length = BTreeMap::new();
        let mut cumulative_offset = 0;
        for dim in 0..dims_count {
            if is_switch_dim.get(dim).copied().unwrap_or(false) {
                let switches: usize = npus_count_per_dim[dim + 1..].iter().product();
                offset_by_suffix_length.insert(dims_count - dim - 1, cumulative_offset);
                cumulative_offset += switches;
            }
        }

        Self {
            total_npus_count,
            npus_count_per_dim,
            is_switch_dim,
            offset_by_suffix_length,
            switches_count: cumulative_offset,
        }
    }

    pub fn switches_count(&self) -> usize {
        self.switches_count
    }

    /// First dimension holding a switch coordinate, if any
    pub fn switch_dim(&self, address: &[usize]) -> Option<usize> {
        (0..address.len().min(self.npus_count_per_dim.len())).find(|dim| {
            self.is_switch_dim[*dim] && address[*dim] == self.npus_count_per_dim[*dim]
        })
    }

    pub fn translate_address_to_id(&self, address: &[usize]) -> Result<DeviceId, TopologyError> {
        let invalid = || TopologyError::InvalidAddress {
            address: address.to_vec(),
            shape: self.npus_count_per_dim.clone(),
        };
        let switch_dim = self.switch_dim(address).ok_or_else(invalid)?;
        let suffix = &address[switch_dim + 1..];
        let offset = self
            .offset_by_suffix_length
            .get(&suffix.len())
            .ok_or_else(invalid)?;
        let partial = mixed_radix_offset(suffix, &self.npus_count_per_dim[switch_dim + 1..]);
        Ok(self.total_npus_count + offset + partial)
    }
}

/// Flat id <-> multi-dimensional address translation for one shape
#[derive(Debug, Clone, PartialEq)]
pub struct AddressSpace {
    npus_count_per_dim: Vec<usize>,
    npus_count: usize,
    switches: SwitchTranslationUnit,
}

impl AddressSpace {
    /// Address space with no switch dimensions
    pub fn new(npus_count_per_dim: Vec<usize>) -> Self {
        let is_switch_dim = vec![false; npus_count_per_dim.len()];
        Self::with_switches(npus_count_per_dim, is_switch_dim)
    }

    pub fn with_switches(npus_count_per_dim: Vec<usize>, is_switch_dim: Vec<bool>) -> Self {
        let npus_count = npus_count_per_dim.iter().product();
        let switches = SwitchTranslationUnit::new(npus_count_per_dim.clone(), is_switch_dim);
        Self {
            npus_count_per_dim,
            npus_count,
            switches,
        }
    }

    pub fn dims_count(&self) -> usize {
        self.npus_count_per_dim.len()
    }

    pub fn shape(&self) -> &[usize] {
        &self.npus_count_per_dim
    }

    pub fn npus_count(&self) -> usize {
        self.npus_count
    }

    /// NPUs plus every switch device
    pub fn total_devices_count(&self) -> usize {
        self.npus_count + self.switches.switches_count()
    }

    /// Decode an NPU id, most significant dimension first
    pub fn translate_address(&self, npu_id: DeviceId) -> Result<MultiDimAddress, TopologyError> {
        if npu_id >= self.npus_count {
            return Err(TopologyError::UnknownDevice {
                device: npu_id,
                count: self.npus_count,
            });
        }
        let mut address = vec![0; self.dims_count()];
        let mut leftover = npu_id;
        let mut denominator = self.npus_count;
        for dim in (0..self.dims_count()).rev() {
            denominator /= self.npus_count_per_dim[dim];
            address[dim] = leftover / denominator;
            leftover %= denominator;
        }
        Ok(address)
    }

    /// Encode an NPU or switch address back into a device id
    pub fn translate_address_back(&self, address: &[usize]) -> Result<DeviceId, TopologyError> {
        if address.len() != self.dims_count() {
            return Err(self.invalid(address));
        }
        if self.switches.switch_dim(address).is_some() {
            return self.switches.translate_address_to_id(address);
        }
        if address
            .iter()
            .zip(&self.npus_count_per_dim)
            .any(|(coordinate, size)| coordinate >= size)
        {
            return Err(self.invalid(address));
        }
        Ok(mixed_radix_offset(address, &self.npus_count_per_dim))
    }

    /// First (least significant) dimension where the two addresses differ
    pub fn dim_to_transfer(&self, src: &[usize], dst: &[usize]) -> Option<usize> {
        src.iter().zip(dst).position(|(a, b)| a != b)
    }

    fn invalid(&self, address: &[usize]) -> TopologyError {
        TopologyError::InvalidAddress {
            address: address.to_vec(),
            shape: self.npus_count_per_dim.clone(),
        }
    }
}

/// Expand a policy of dimension `dim` over every coordinate combination of
/// the other dimensions.
pub fn generate_address_pairs(
    upper: &[usize],
    policy: &ConnectionPolicy,
    dim: usize,
) -> Vec<(MultiDimAddress, MultiDimAddress)> {
    let free_dims: Vec<usize> = (0..upper.len()).filter(|d| *d != dim).collect();
    let combinations: usize = free_dims.iter().map(|d| upper[*d]).product();

    (0..combinations)
        .map(|mut combination| {
            let mut src = vec![0; upper.len()];
            for d in free_dims.iter().rev() {
                src[*d] = combination % upper[*d];
                combination /= upper[*d];
            }
            let mut dst = src.clone();
            src[dim] = policy.src;
            dst[dim] = policy.dst;
            (src, dst)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_address() {
        let space = AddressSpace::new(vec![2, 8, 4]);
        assert_eq!(space.npus_count(), 64);
        assert_eq!(space.translate_address(47).unwrap(), vec![1, 7, 2]);
        assert_eq!(space.translate_address_back(&[1, 7, 2]).unwrap(), 47);
    }

    #[test]
    fn test_round_trip_every_id() {
        for shape in [vec![2, 8, 4], vec![3, 5], vec![7], vec![2, 2, 2, 3]] {
            let space = AddressSpace::new(shape);
            for id in 0..space.npus_count() {
                let address = space.translate_address(id).unwrap();
                assert_eq!(space.translate_address_back(&address).unwrap(), id);
            }
        }
    }

    #[test]
    fn test_out_of_range() {
        let space = AddressSpace::new(vec![2, 4]);
        assert!(matches!(
            space.translate_address(8),
            Err(TopologyError::UnknownDevice { device: 8, count: 8 })
        ));
        assert!(matches!(
            space.translate_address_back(&[2, 0]),
            Err(TopologyError::InvalidAddress { .. })
        ));
        assert!(space.translate_address_back(&[0]).is_err());
    }

    #[test]
    fn test_dim_to_transfer() {
        let space = AddressSpace::new(vec![2, 8, 4]);
        assert_eq!(space.dim_to_transfer(&[1, 7, 2], &[1, 3, 0]), Some(1));
        assert_eq!(space.dim_to_transfer(&[0, 7, 2], &[1, 3, 0]), Some(0));
        assert_eq!(space.dim_to_transfer(&[1, 7, 2], &[1, 7, 2]), None);
    }

    #[test]
    fn test_switch_translation() {
        // switch in the lowest dimension: one switch per higher-dimension group
        let space = AddressSpace::with_switches(vec![4, 2, 2], vec![true, false, false]);
        assert_eq!(space.total_devices_count(), 20);
        assert_eq!(space.translate_address_back(&[4, 0, 0]).unwrap(), 16);
        assert_eq!(space.translate_address_back(&[4, 1, 1]).unwrap(), 19);

        let space = AddressSpace::with_switches(vec![2, 2], vec![true, true]);
        assert_eq!(space.total_devices_count(), 7);
        assert_eq!(space.translate_address_back(&[2, 1]).unwrap(), 5);
        assert_eq!(space.translate_address_back(&[0, 2]).unwrap(), 6);
    }

    #[test]
    fn test_generate_address_pairs() {
        let pairs = generate_address_pairs(&[2, 3], &ConnectionPolicy::new(0, 1), 0);
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0], (vec![0, 0], vec![1, 0]));
        assert_eq!(pairs[2], (vec![0, 2], vec![1, 2]));

        let pairs = generate_address_pairs(&[2, 3, 2], &ConnectionPolicy::new(2, 0), 1);
        assert_eq!(pairs.len(), 4);
        assert!(pairs
            .iter()
            .all(|(src, dst)| src[1] == 2 && dst[1] == 0 && src[0] == dst[0] && src[2] == dst[2]));
    }
}
