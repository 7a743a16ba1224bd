use scsiprims_codec::{CodecError, CommandBlock, FieldLayout, FieldValues, Result, TransferLength};

/// Which way a command moves data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataPhase {
    None,
    /// Device to caller; length taken from the allocation length field.
    In,
    /// Caller to device; length taken from the parameter list length field.
    Out,
}

/// Everything needed to build and interpret one command.
#[derive(Debug)]
pub struct CommandDefinition {
    /// Lowercase command name, e.g. `readcapacity16`.
    pub name: &'static str,
    pub opcode: u8,
    /// Layout of the command descriptor block.
    pub cdb: FieldLayout,
    pub phase: DataPhase,
    /// CDB field holding the transfer length, for commands with a data phase.
    pub length_field: Option<&'static str>,
    /// Values used for fields the caller leaves out.
    pub defaults: &'static [(&'static str, u64)],
    /// Layout of the returned data, if the command returns any.
    pub datain: Option<FieldLayout>,
}

impl CommandDefinition {
    /// Caller values merged over the defaults.
    pub fn values(&self, values: &FieldValues) -> FieldValues {
        let mut merged: FieldValues = self.defaults.iter().copied().collect();
        for (name, value) in values.iter() {
            merged.insert(name, value);
        }
        merged
    }

    /// Declared transfer lengths for a set of merged values.
    pub fn transfer(&self, values: &FieldValues) -> TransferLength {
        let len = self
            .length_field
            .and_then(|field| values.get(field))
            .unwrap_or(0) as usize;
        match self.phase {
            DataPhase::None => TransferLength::NONE,
            DataPhase::In => TransferLength::data_in(len),
            DataPhase::Out => TransferLength::data_out(len),
        }
    }

    /// Build a command block from caller values.
    pub fn build(&self, values: &FieldValues) -> Result<CommandBlock> {
        let values = self.values(values);
        CommandBlock::build(self.opcode, &self.cdb, &values, self.transfer(&values))
    }

    /// Build a command block that carries `data` to the device.
    ///
    /// For [`DataPhase::Out`] commands the length field is set to
    /// `data.len()` unless the caller gave one. Data longer than the length
    /// field can express is refused.
    pub fn build_with_data(&self, values: &FieldValues, data: &[u8]) -> Result<CommandBlock> {
        let mut values = self.values(values);
        let length_spec = match self.phase {
            DataPhase::Out => self.length_field.and_then(|name| self.cdb.get(name)),
            DataPhase::None | DataPhase::In => None,
        };
        if let Some(spec) = length_spec {
            let len = data.len() as u64;
            if len > spec.max_value() {
                return Err(CodecError::TransferTooLarge {
                    len: data.len(),
                    max: spec.max_value() as usize,
                });
            }
            if !values.contains(&spec.name) {
                values.insert(spec.name.to_string(), len);
            }
        }
        let cmd = CommandBlock::build(self.opcode, &self.cdb, &values, self.transfer(&values))?;
        Ok(cmd.with_dataout(data))
    }

    /// Interpret the data returned by a successful execution.
    ///
    /// Returns `Ok(None)` for commands that return no structured data.
    pub fn unmarshall(&self, cmd: &CommandBlock) -> Result<Option<FieldValues>> {
        self.datain
            .as_ref()
            .map(|layout| cmd.unmarshall_datain(layout))
            .transpose()
    }
}
