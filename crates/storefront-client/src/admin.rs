//! Admin operations: menu, categories, stock and promos.
//!
//! Every operation needs a prior [`AdminPanel::login`]. Failures are
//! reported as notices (the backend's error text when it sent one) and
//! returned as errors; every successful mutation reloads the catalog.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use storefront_core::catalog::MenuSort;
use storefront_core::{ItemId, MenuItem, Notice, PromoRecord};

use crate::api::MenuRecord;
use crate::error::{Error, Result};
use crate::session::Storefront;

/// Largest accepted image upload.
pub const MAX_IMAGE_BYTES: usize = 3 * 1024 * 1024;

const IMAGE_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("webp", "image/webp"),
    ("gif", "image/gif"),
];

/// An image file to upload with a menu item.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// File name sent to the backend
    pub name: String,
    /// MIME type
    pub mime: String,
    /// File contents
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImageUpload {
    /// Checks type (by extension) and size.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let ext = Path::new(&name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let mime = IMAGE_TYPES
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, m)| m.to_string())
            .ok_or_else(|| storefront_core::Error::validation_field("image", "Format gambar harus JPG/PNG/WebP/GIF"))?;
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(storefront_core::Error::validation_field("image", "Ukuran foto > 3MB").into());
        }
        Ok(Self { name, mime, bytes })
    }

    /// Reads and checks a file.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| storefront_core::Error::io_with_path(e, path))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Self::new(name, bytes)
    }

    /// `data:<mime>;base64,<...>`
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

/// Menu item form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuForm {
    /// Existing item id; `None` creates a new item
    pub id: Option<String>,
    /// Display name
    pub name: String,
    /// Category name
    pub category: String,
    /// Base price
    pub price: i64,
    /// Stock
    pub stock: i64,
    /// Listed for sale
    pub active: bool,
    /// Current image URL, replaced when `image` is uploaded
    pub image_url: String,
    /// New image to upload first
    pub image: Option<ImageUpload>,
}

impl Default for MenuForm {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            category: String::new(),
            price: 0,
            stock: 0,
            active: true,
            image_url: String::new(),
            image: None,
        }
    }
}

impl MenuForm {
    /// Prefills the form from an item.
    pub fn from_item(item: &MenuItem) -> Self {
        Self {
            id: Some(item.id.to_string()),
            name: item.name.clone(),
            category: item.category.clone(),
            price: item.price,
            stock: item.stock,
            active: item.active,
            image_url: item.image_url.clone(),
            image: None,
        }
    }
}

/// Admin operations over a [`Storefront`] session.
#[derive(Debug)]
pub struct AdminPanel {
    shop: Storefront,
    authorized: AtomicBool,
}

impl AdminPanel {
    /// Creates a logged-out panel.
    pub fn new(shop: Storefront) -> Self {
        Self {
            shop,
            authorized: AtomicBool::new(false),
        }
    }

    /// The session behind the panel.
    pub fn shop(&self) -> &Storefront {
        &self.shop
    }

    /// Compares `pin` with the configured admin PIN.
    pub fn login(&self, pin: &str) -> bool {
        let ok = !pin.is_empty() && pin.trim() == self.shop.config().admin_pin;
        self.authorized.store(ok, Ordering::Release);
        if !ok {
            tracing::warn!("Admin login rejected");
            self.shop.notifier().notify(Notice::error("PIN salah"));
        }
        ok
    }

    /// Ends the admin session.
    pub fn logout(&self) {
        self.authorized.store(false, Ordering::Release);
    }

    /// Whether [`Self::login`] succeeded.
    pub fn is_authorized(&self) -> bool {
        self.authorized.load(Ordering::Acquire)
    }

    fn ensure_authorized(&self) -> Result<()> {
        if self.is_authorized() {
            Ok(())
        } else {
            Err(Error::NotAuthorized)
        }
    }

    fn info(&self, message: &str) {
        self.shop.notifier().notify(Notice::info(message));
    }

    /// Reports a failure as a notice and passes it on.
    fn failed(&self, err: Error, fallback: &str) -> Error {
        let message = match &err {
            Error::Api { .. } => err.backend_message().unwrap_or(fallback).to_string(),
            Error::Core(core) => core.user_message(),
            _ => fallback.to_string(),
        };
        tracing::warn!(error = %err, "Admin operation failed");
        self.shop.notifier().notify(Notice::error(message));
        err
    }

    fn invalid(&self, field: &str, message: &str) -> Error {
        self.shop.notifier().notify(Notice::warn(message));
        storefront_core::Error::validation_field(field, message).into()
    }

    async fn refresh(&self) {
        if let Err(e) = self.shop.reload(true).await {
            tracing::warn!(error = %e, "Catalog reload after admin change failed");
        }
    }

    /// Menu table filtered by name/category and sorted.
    pub async fn menu_table(&self, filter: &str, sort: MenuSort) -> Vec<MenuItem> {
        self.shop
            .snapshot()
            .await
            .catalog
            .admin_view(filter, sort)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Creates or updates a menu item, uploading its image first.
    pub async fn save_menu(&self, form: MenuForm) -> Result<()> {
        self.ensure_authorized()?;
        let name = form.name.trim().to_string();
        if name.is_empty() {
            return Err(self.invalid("name", "Nama menu wajib diisi"));
        }

        let mut image_url = form.image_url.trim().to_string();
        if let Some(image) = &form.image {
            match self.shop.api().upload_image(&image.data_url(), &image.name).await {
                Ok(url) => image_url = url,
                Err(e) => {
                    let message = match e.backend_message() {
                        Some(detail) => format!("Upload foto gagal: {detail}"),
                        None => "Upload foto gagal".to_string(),
                    };
                    tracing::warn!(error = %e, "Image upload failed");
                    self.shop.notifier().notify(Notice::error(message));
                    return Err(e);
                }
            }
        }

        let record = MenuRecord {
            id: form.id.filter(|id| !id.trim().is_empty()),
            name,
            category: form.category.trim().to_string(),
            price: form.price.max(0),
            stock: form.stock.max(0),
            active: form.active,
            image_url,
        };
        self.shop
            .api()
            .menu_save(&record)
            .await
            .map_err(|e| self.failed(e, "Gagal simpan"))?;
        self.info("Menu tersimpan");
        self.refresh().await;
        Ok(())
    }

    /// Flips an item's `active` flag. Returns the new value.
    pub async fn toggle_menu_active(&self, id: &ItemId) -> Result<bool> {
        self.ensure_authorized()?;
        let item = {
            let state = self.shop.snapshot().await;
            state.catalog.require(id)?.clone()
        };
        let active = !item.active;
        let mut row = item.to_value();
        row["active"] = Value::Bool(active);
        self.shop
            .api()
            .menu_save_raw(row)
            .await
            .map_err(|e| self.failed(e, "Gagal toggle aktif"))?;
        self.refresh().await;
        Ok(active)
    }

    /// Deletes a menu item.
    pub async fn delete_menu(&self, id: &ItemId) -> Result<()> {
        self.ensure_authorized()?;
        self.shop
            .api()
            .menu_delete(id)
            .await
            .map_err(|e| self.failed(e, "Gagal hapus"))?;
        self.info("Terhapus");
        self.refresh().await;
        Ok(())
    }

    /// Creates (`id = None`) or renames a category.
    pub async fn save_category(&self, id: Option<&str>, name: &str) -> Result<()> {
        self.ensure_authorized()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(self.invalid("name", "Nama kategori wajib diisi"));
        }
        self.shop
            .api()
            .category_save(id, name)
            .await
            .map_err(|e| self.failed(e, "Gagal simpan"))?;
        self.info("Kategori tersimpan");
        self.refresh().await;
        Ok(())
    }

    /// Deletes a category.
    pub async fn delete_category(&self, id: &str) -> Result<()> {
        self.ensure_authorized()?;
        self.shop
            .api()
            .category_delete(id)
            .await
            .map_err(|e| self.failed(e, "Gagal hapus"))?;
        self.info("Terhapus");
        self.refresh().await;
        Ok(())
    }

    /// Adds `delta` units to an item's stock.
    pub async fn adjust_stock(&self, item_id: &ItemId, delta: i64, note: &str) -> Result<()> {
        self.ensure_authorized()?;
        if item_id.is_empty() || delta == 0 {
            return Err(self.invalid("delta", "Pilih item & isi delta"));
        }
        self.shop
            .api()
            .stock_adjust(item_id, delta, note.trim())
            .await
            .map_err(|e| self.failed(e, "Gagal update stok"))?;
        tracing::info!(item = %item_id, delta, "Stock adjusted");
        self.info("Stok diperbarui");
        self.refresh().await;
        Ok(())
    }

    /// Promo list, sorted by code.
    pub async fn promos(&self) -> Result<Vec<PromoRecord>> {
        self.ensure_authorized()?;
        self.shop
            .api()
            .promo_list()
            .await
            .map_err(|e| self.failed(e, "Gagal memuat promo"))
    }

    /// Creates or updates a promo.
    pub async fn save_promo(&self, record: &PromoRecord) -> Result<()> {
        self.ensure_authorized()?;
        self.shop
            .api()
            .promo_save(record)
            .await
            .map_err(|e| self.failed(e, "Gagal simpan promo"))?;
        self.info("Promo tersimpan");
        self.refresh().await;
        Ok(())
    }

    /// Deletes a promo.
    pub async fn delete_promo(&self, id: &ItemId) -> Result<()> {
        self.ensure_authorized()?;
        self.shop
            .api()
            .promo_delete(id)
            .await
            .map_err(|e| self.failed(e, "Gagal hapus"))?;
        self.info("Promo terhapus");
        self.refresh().await;
        Ok(())
    }

    /// Re-saves a promo with `active` flipped. Returns the new value.
    pub async fn toggle_promo(&self, record: &PromoRecord) -> Result<bool> {
        self.ensure_authorized()?;
        let mut flipped = record.clone();
        flipped.active = !record.active;
        self.shop
            .api()
            .promo_save(&flipped)
            .await
            .map_err(|e| self.failed(e, "Gagal toggle promo"))?;
        self.refresh().await;
        Ok(flipped.active)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_image_checks() {
        let img = ImageUpload::new("Foto.JPG", vec![1, 2, 3]).unwrap();
        assert_eq!(img.mime, "image/jpeg");
        assert_eq!(img.data_url(), "data:image/jpeg;base64,AQID");

        let err = ImageUpload::new("menu.bmp", vec![0]).unwrap_err();
        assert_eq!(err.user_message(), "Format gambar harus JPG/PNG/WebP/GIF");

        let err = ImageUpload::new("big.png", vec![0; MAX_IMAGE_BYTES + 1]).unwrap_err();
        assert_eq!(err.user_message(), "Ukuran foto > 3MB");
    }

    #[tokio::test]
    async fn test_image_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.webp");
        tokio::fs::write(&path, b"RIFF").await.unwrap();
        let img = ImageUpload::from_path(&path).await.unwrap();
        assert_eq!(img.name, "a.webp");
        assert_eq!(img.mime, "image/webp");
    }

    #[test]
    fn test_menu_form_defaults_active() {
        assert!(MenuForm::default().active);
    }
}
