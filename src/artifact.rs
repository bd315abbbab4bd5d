use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::classifier::MlpClassifier;
use crate::error::{Error, Result};
use crate::scaler::StandardScaler;

const MAGIC: &[u8; 4] = b"MLPC";
pub const FORMAT_VERSION: u16 = 1;

/// A fitted classifier together with the scaler its inputs must go through.
/// Saved and loaded only as a pair.
///
/// File layout: 4-byte magic, big-endian u16 format version, big-endian u64
/// payload length, then the JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub classifier: MlpClassifier,
    pub scaler: StandardScaler,
}

impl Artifact {
    pub fn new(classifier: MlpClassifier, scaler: StandardScaler) -> Result<Self> {
        let artifact = Artifact { classifier, scaler };
        artifact.check_consistency()?;
        Ok(artifact)
    }

    fn check_consistency(&self) -> Result<()> {
        if self.classifier.n_features_in() != self.scaler.n_features() {
            return Err(Error::CorruptArtifact(format!(
                "classifier expects {} features but scaler was fitted on {}",
                self.classifier.n_features_in(),
                self.scaler.n_features()
            )));
        }

        Ok(())
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        let payload = serde_json::to_vec(self)?;
        writer.write_all(MAGIC)?;
        writer.write_u16::<BigEndian>(FORMAT_VERSION)?;
        writer.write_u64::<BigEndian>(payload.len() as u64)?;
        writer.write_all(&payload)?;
        writer.flush()?;

        Ok(())
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic).map_err(truncated)?;
        if &magic != MAGIC {
            return Err(Error::CorruptArtifact("not a model artifact (bad magic)".to_string()));
        }

        let version = reader.read_u16::<BigEndian>().map_err(truncated)?;
        if version != FORMAT_VERSION {
            return Err(Error::UnsupportedArtifactVersion {
                expected: FORMAT_VERSION,
                found: version,
            });
        }

        let len = reader.read_u64::<BigEndian>().map_err(truncated)?;
        let mut payload = Vec::new();
        reader.take(len).read_to_end(&mut payload)?;
        if (payload.len() as u64) < len {
            return Err(Error::CorruptArtifact(format!(
                "payload truncated: {} of {} bytes",
                payload.len(),
                len
            )));
        }

        let artifact: Artifact = serde_json::from_slice(&payload)
            .map_err(|e| Error::CorruptArtifact(format!("undecodable payload: {}", e)))?;
        artifact.check_consistency()?;

        Ok(artifact)
    }

    /// Overwrites `path`. The parent directory must exist.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))?;
        debug!("Model artifact written to {}", path.display());

        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let artifact = Artifact::read_from(BufReader::new(file))?;
        debug!("Model artifact loaded from {}", path.display());

        Ok(artifact)
    }
}

fn truncated(e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::CorruptArtifact("header truncated".to_string())
    } else {
        Error::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Hyperparameters;
    use crate::math::Matrix;
    use rand::{SeedableRng, StdRng};
    use tempfile::TempDir;

    fn fitted() -> (Artifact, Matrix) {
        let x = Matrix::from_vec(6, 2, vec![
            -1.0, 0.3, -1.2, 0.1, -0.8, -0.2, //
            1.0, 0.2, 1.1, -0.1, 0.9, 0.0,
        ]);
        let y: Vec<String> = vec!["a", "a", "a", "b", "b", "b"].into_iter().map(String::from).collect();
        let (scaler, scaled) = StandardScaler::fit_transform(&x).unwrap();
        let hp = Hyperparameters {
            hidden_layer_sizes: vec![4],
            max_iter: 20,
            ..Hyperparameters::default()
        };
        let mut rng: StdRng = SeedableRng::from_seed(&[1usize][..]);
        let classifier = MlpClassifier::fit(&scaled, &y, &hp, &mut rng).unwrap();
        (Artifact::new(classifier, scaler).unwrap(), x)
    }

    #[test]
    fn file_round_trip_keeps_predictions() {
        let (artifact, x) = fitted();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        artifact.write_to_file(&path).unwrap();

        let loaded = Artifact::load_from_file(&path).unwrap();
        assert_eq!(loaded, artifact);

        let scaled = loaded.scaler.transform(&x).unwrap();
        assert_eq!(
            loaded.classifier.predict(&scaled).unwrap(),
            artifact.classifier.predict(&artifact.scaler.transform(&x).unwrap()).unwrap()
        );
    }

    #[test]
    fn header_carries_magic_and_version() {
        let (artifact, _) = fitted();
        let mut buf = Vec::new();
        artifact.write_to(&mut buf).unwrap();
        assert_eq!(&buf[..4], b"MLPC");
        assert_eq!(&buf[4..6], &[0, 1]);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = Artifact::load_from_file(dir.path().join("absent.bin")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn rejects_foreign_file() {
        match Artifact::read_from(&b"PK\x03\x04 not a model"[..]) {
            Err(Error::CorruptArtifact(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn rejects_truncated_header_and_payload() {
        let (artifact, _) = fitted();
        let mut buf = Vec::new();
        artifact.write_to(&mut buf).unwrap();

        for cut in &[3, 9, buf.len() - 1] {
            match Artifact::read_from(&buf[..*cut]) {
                Err(Error::CorruptArtifact(_)) => {}
                other => panic!("cut at {}: unexpected result: {:?}", cut, other),
            }
        }
    }

    #[test]
    fn rejects_other_versions() {
        let (artifact, _) = fitted();
        let mut buf = Vec::new();
        artifact.write_to(&mut buf).unwrap();
        buf[5] = 9;

        match Artifact::read_from(&buf[..]) {
            Err(Error::UnsupportedArtifactVersion { expected, found }) => {
                assert_eq!(expected, 1);
                assert_eq!(found, 9);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    fn encode(payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);
        buf.write_u16::<BigEndian>(FORMAT_VERSION).unwrap();
        buf.write_u64::<BigEndian>(payload.len() as u64).unwrap();
        buf.extend_from_slice(payload);
        buf
    }

    #[test]
    fn load_rejects_scaler_with_extra_feature() {
        let (artifact, _) = fitted();
        let mut value = serde_json::to_value(&artifact).unwrap();
        for field in &["mean", "var", "scale"] {
            value["scaler"][*field].as_array_mut().unwrap().push(serde_json::json!(1.0));
        }
        let buf = encode(&serde_json::to_vec(&value).unwrap());

        match Artifact::read_from(&buf[..]) {
            Err(Error::CorruptArtifact(msg)) => assert!(msg.contains("expects 2 features")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn load_accepts_unedited_payload() {
        let (artifact, _) = fitted();
        let buf = encode(&serde_json::to_vec(&artifact).unwrap());
        assert_eq!(Artifact::read_from(&buf[..]).unwrap(), artifact);
    }

    #[test]
    fn rejects_mismatched_pair() {
        let (artifact, _) = fitted();
        let other_scaler = StandardScaler::fit(&Matrix::zeros(2, 5)).unwrap();
        match Artifact::new(artifact.classifier, other_scaler) {
            Err(Error::CorruptArtifact(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
