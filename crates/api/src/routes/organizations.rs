use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use uuid::Uuid;

use crate::{
    notify::NotificationService,
    routes::models::{
        AddMemberRequest, ContactResponse, ContactsResponse, Contract, ContractResponse,
        ContractsResponse, CreateContactRequest, CreateContractRequest,
        CreateOrganizationRequest, MemberResponse, MembersResponse, Organization,
        OrganizationContact, OrganizationMember, OrganizationResponse, UpdateContactRequest,
        UpdateContractRequest, UpdateMemberRoleRequest, UpdateOrganizationRequest,
    },
    util::require_bearer,
    ApiError, AppState,
};

const MEMBER_ROLES: &[&str] = &["admin", "staff"];
const CONTRACT_STATUSES: &[&str] = &["draft", "active", "terminated"];

pub(crate) async fn resolve_org(
    state: &AppState,
    public_id: &str,
) -> Result<Option<(i64, String)>, ApiError> {
    sqlx::query_as::<_, (i64, String)>("SELECT id, name FROM organizations WHERE public_id = ?")
        .bind(public_id)
        .fetch_optional(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to resolve organization: {}", e);
            ApiError::internal_server_error("Failed to resolve organization")
        })
}

pub(crate) async fn member_role(
    state: &AppState,
    org_id: i64,
    user_id: i64,
) -> Result<Option<String>, ApiError> {
    sqlx::query_scalar::<_, String>(
        "SELECT role FROM organization_members WHERE org_id = ? AND user_id = ?",
    )
    .bind(org_id)
    .bind(user_id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to check organization role: {}", e);
        ApiError::internal_server_error("Failed to check organization role")
    })
}

async fn fetch_organization(state: &AppState, org_id: i64) -> Result<Organization, ApiError> {
    sqlx::query_as::<_, Organization>(
        r#"
        SELECT id, public_id, name, description, website, verified, created_at, updated_at
        FROM organizations
        WHERE id = ?
        "#,
    )
    .bind(org_id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch organization: {}", e);
        ApiError::internal_server_error("Failed to fetch organization")
    })?
    .ok_or_else(|| ApiError::not_found("Organization not found"))
}

pub async fn create_organization(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateOrganizationRequest>,
) -> Result<Json<OrganizationResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("Organization name must not be empty"));
    }

    let public_id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    let org_id = sqlx::query(
        r#"
        INSERT INTO organizations (public_id, name, description, website, verified, created_at, updated_at)
        VALUES (?, ?, ?, ?, FALSE, ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.website)
    .bind(&now)
    .bind(&now)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to create organization: {}", e);
        ApiError::internal_server_error("Failed to create organization")
    })?
    .last_insert_rowid();

    // The creator is the first roster admin.
    sqlx::query(
        "INSERT INTO organization_members (org_id, user_id, role, joined_at) VALUES (?, ?, 'admin', ?)",
    )
    .bind(org_id)
    .bind(user.id)
    .bind(&now)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to add organization admin: {}", e);
        ApiError::internal_server_error("Failed to add organization admin")
    })?;

    state
        .authenticator()
        .set_user_role(user.id, reclaim_auth::ROLE_ORGANIZATION)
        .await
        .map_err(ApiError::from)?;

    let organization = fetch_organization(&state, org_id).await?;

    Ok(Json(OrganizationResponse { organization }))
}

pub async fn get_organization(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<OrganizationResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    state.authenticate(&token).await?;

    let (org_db_id, _) = resolve_org(&state, &org_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Organization not found"))?;

    let organization = fetch_organization(&state, org_db_id).await?;

    Ok(Json(OrganizationResponse { organization }))
}

pub async fn update_organization(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<UpdateOrganizationRequest>,
) -> Result<Json<OrganizationResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (org_db_id, _) = resolve_org(&state, &org_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Organization not found"))?;

    let role = member_role(&state, org_db_id, user.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Not a member of this organization"))?;
    if role != "admin" {
        return Err(ApiError::forbidden(
            "Only admins can update the organization",
        ));
    }

    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE organizations
        SET name = COALESCE(?, name),
            description = COALESCE(?, description),
            website = COALESCE(?, website),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.website)
    .bind(&now)
    .bind(org_db_id)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to update organization: {}", e);
        ApiError::internal_server_error("Failed to update organization")
    })?;

    let organization = fetch_organization(&state, org_db_id).await?;

    Ok(Json(OrganizationResponse { organization }))
}

pub async fn list_members(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MembersResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (org_db_id, _) = resolve_org(&state, &org_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Organization not found"))?;

    member_role(&state, org_db_id, user.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Not a member of this organization"))?;

    let members = sqlx::query_as::<_, OrganizationMember>(
        r#"
        SELECT id, org_id, user_id, role, joined_at
        FROM organization_members
        WHERE org_id = ?
        ORDER BY joined_at ASC
        "#,
    )
    .bind(org_db_id)
    .fetch_all(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch members: {}", e);
        ApiError::internal_server_error("Failed to fetch members")
    })?;

    Ok(Json(MembersResponse { members }))
}

pub async fn add_member(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<AddMemberRequest>,
) -> Result<Json<MemberResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    if !MEMBER_ROLES.contains(&req.role.as_str()) {
        return Err(ApiError::bad_request("Invalid role"));
    }

    let (org_db_id, org_name) = resolve_org(&state, &org_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Organization not found"))?;

    let role = member_role(&state, org_db_id, user.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Not a member of this organization"))?;
    if role != "admin" {
        return Err(ApiError::forbidden("Only admins can add members"));
    }

    let target_user_id: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
        .bind(&req.email)
        .fetch_optional(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to look up user: {}", e);
            ApiError::internal_server_error("Failed to look up user")
        })?;

    let target_user_id =
        target_user_id.ok_or_else(|| ApiError::not_found("No user with that email"))?;

    let existing = member_role(&state, org_db_id, target_user_id).await?;
    if existing.is_some() {
        return Err(ApiError::conflict("User is already a member"));
    }

    let now = chrono::Utc::now().to_rfc3339();

    let member_id = sqlx::query(
        "INSERT INTO organization_members (org_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)",
    )
    .bind(org_db_id)
    .bind(target_user_id)
    .bind(&req.role)
    .bind(&now)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to add member: {}", e);
        ApiError::internal_server_error("Failed to add member")
    })?
    .last_insert_rowid();

    NotificationService::notify_member_added(
        state.db_pool(),
        target_user_id,
        &org_name,
        &req.role,
    )
    .await?;

    let member = OrganizationMember {
        id: member_id,
        org_id: org_db_id,
        user_id: target_user_id,
        role: req.role,
        joined_at: now,
    };

    Ok(Json(MemberResponse { member }))
}

pub async fn update_member_role(
    State(state): State<AppState>,
    Path((org_id, member_user_id)): Path<(String, i64)>,
    headers: HeaderMap,
    Json(req): Json<UpdateMemberRoleRequest>,
) -> Result<Json<MemberResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    if !MEMBER_ROLES.contains(&req.role.as_str()) {
        return Err(ApiError::bad_request("Invalid role"));
    }

    let (org_db_id, _) = resolve_org(&state, &org_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Organization not found"))?;

    let role = member_role(&state, org_db_id, user.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Not a member of this organization"))?;
    if role != "admin" {
        return Err(ApiError::forbidden("Only admins can change member roles"));
    }

    let target_role = member_role(&state, org_db_id, member_user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Member not found"))?;

    // Keep at least one roster admin around.
    if target_role == "admin" && req.role != "admin" {
        let admin_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM organization_members WHERE org_id = ? AND role = 'admin'",
        )
        .bind(org_db_id)
        .fetch_one(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to count admins: {}", e);
            ApiError::internal_server_error("Failed to validate role change")
        })?;

        if admin_count <= 1 {
            return Err(ApiError::bad_request("Cannot demote the last admin"));
        }
    }

    sqlx::query("UPDATE organization_members SET role = ? WHERE org_id = ? AND user_id = ?")
        .bind(&req.role)
        .bind(org_db_id)
        .bind(member_user_id)
        .execute(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to update member role: {}", e);
            ApiError::internal_server_error("Failed to update member role")
        })?;

    let member = sqlx::query_as::<_, OrganizationMember>(
        r#"
        SELECT id, org_id, user_id, role, joined_at
        FROM organization_members
        WHERE org_id = ? AND user_id = ?
        "#,
    )
    .bind(org_db_id)
    .bind(member_user_id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch updated member: {}", e);
        ApiError::internal_server_error("Failed to fetch updated member")
    })?
    .ok_or_else(|| ApiError::not_found("Member not found"))?;

    Ok(Json(MemberResponse { member }))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Path((org_id, member_user_id)): Path<(String, i64)>,
    headers: HeaderMap,
) -> Result<(), ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (org_db_id, _) = resolve_org(&state, &org_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Organization not found"))?;

    let role = member_role(&state, org_db_id, user.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Not a member of this organization"))?;
    if role != "admin" {
        return Err(ApiError::forbidden("Only admins can remove members"));
    }

    let target_role = member_role(&state, org_db_id, member_user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Member not found"))?;

    if target_role == "admin" {
        let admin_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM organization_members WHERE org_id = ? AND role = 'admin'",
        )
        .bind(org_db_id)
        .fetch_one(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to count admins: {}", e);
            ApiError::internal_server_error("Failed to validate removal")
        })?;

        if admin_count <= 1 {
            return Err(ApiError::bad_request("Cannot remove the last admin"));
        }
    }

    sqlx::query("DELETE FROM organization_members WHERE org_id = ? AND user_id = ?")
        .bind(org_db_id)
        .bind(member_user_id)
        .execute(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to remove member: {}", e);
            ApiError::internal_server_error("Failed to remove member")
        })?;

    Ok(())
}

pub async fn list_contacts(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ContactsResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (org_db_id, _) = resolve_org(&state, &org_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Organization not found"))?;

    member_role(&state, org_db_id, user.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Not a member of this organization"))?;

    let contacts = sqlx::query_as::<_, OrganizationContact>(
        r#"
        SELECT id, org_id, label, name, email, phone, created_at, updated_at
        FROM organization_contacts
        WHERE org_id = ?
        ORDER BY created_at ASC
        "#,
    )
    .bind(org_db_id)
    .fetch_all(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch contacts: {}", e);
        ApiError::internal_server_error("Failed to fetch contacts")
    })?;

    Ok(Json(ContactsResponse { contacts }))
}

pub async fn create_contact(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CreateContactRequest>,
) -> Result<Json<ContactResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (org_db_id, _) = resolve_org(&state, &org_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Organization not found"))?;

    let role = member_role(&state, org_db_id, user.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Not a member of this organization"))?;
    if role != "admin" {
        return Err(ApiError::forbidden("Only admins can manage contacts"));
    }

    let now = chrono::Utc::now().to_rfc3339();

    let contact_id = sqlx::query(
        r#"
        INSERT INTO organization_contacts (org_id, label, name, email, phone, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(org_db_id)
    .bind(&req.label)
    .bind(&req.name)
    .bind(&req.email)
    .bind(&req.phone)
    .bind(&now)
    .bind(&now)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to create contact: {}", e);
        ApiError::internal_server_error("Failed to create contact")
    })?
    .last_insert_rowid();

    let contact = fetch_contact(&state, org_db_id, contact_id).await?;

    Ok(Json(ContactResponse { contact }))
}

pub async fn update_contact(
    State(state): State<AppState>,
    Path((org_id, contact_id)): Path<(String, i64)>,
    headers: HeaderMap,
    Json(req): Json<UpdateContactRequest>,
) -> Result<Json<ContactResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (org_db_id, _) = resolve_org(&state, &org_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Organization not found"))?;

    let role = member_role(&state, org_db_id, user.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Not a member of this organization"))?;
    if role != "admin" {
        return Err(ApiError::forbidden("Only admins can manage contacts"));
    }

    let now = chrono::Utc::now().to_rfc3339();

    let result = sqlx::query(
        r#"
        UPDATE organization_contacts
        SET label = COALESCE(?, label),
            name = COALESCE(?, name),
            email = COALESCE(?, email),
            phone = COALESCE(?, phone),
            updated_at = ?
        WHERE id = ? AND org_id = ?
        "#,
    )
    .bind(&req.label)
    .bind(&req.name)
    .bind(&req.email)
    .bind(&req.phone)
    .bind(&now)
    .bind(contact_id)
    .bind(org_db_id)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to update contact: {}", e);
        ApiError::internal_server_error("Failed to update contact")
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Contact not found"));
    }

    let contact = fetch_contact(&state, org_db_id, contact_id).await?;

    Ok(Json(ContactResponse { contact }))
}

pub async fn delete_contact(
    State(state): State<AppState>,
    Path((org_id, contact_id)): Path<(String, i64)>,
    headers: HeaderMap,
) -> Result<(), ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (org_db_id, _) = resolve_org(&state, &org_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Organization not found"))?;

    let role = member_role(&state, org_db_id, user.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Not a member of this organization"))?;
    if role != "admin" {
        return Err(ApiError::forbidden("Only admins can manage contacts"));
    }

    let result = sqlx::query("DELETE FROM organization_contacts WHERE id = ? AND org_id = ?")
        .bind(contact_id)
        .bind(org_db_id)
        .execute(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete contact: {}", e);
            ApiError::internal_server_error("Failed to delete contact")
        })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Contact not found"));
    }

    Ok(())
}

async fn fetch_contact(
    state: &AppState,
    org_id: i64,
    contact_id: i64,
) -> Result<OrganizationContact, ApiError> {
    sqlx::query_as::<_, OrganizationContact>(
        r#"
        SELECT id, org_id, label, name, email, phone, created_at, updated_at
        FROM organization_contacts
        WHERE id = ? AND org_id = ?
        "#,
    )
    .bind(contact_id)
    .bind(org_id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch contact: {}", e);
        ApiError::internal_server_error("Failed to fetch contact")
    })?
    .ok_or_else(|| ApiError::not_found("Contact not found"))
}

pub async fn list_contracts(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ContractsResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (org_db_id, _) = resolve_org(&state, &org_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Organization not found"))?;

    member_role(&state, org_db_id, user.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Not a member of this organization"))?;

    let contracts = sqlx::query_as::<_, Contract>(
        r#"
        SELECT id, org_id, title, terms, starts_at, ends_at, status, created_at, updated_at
        FROM contracts
        WHERE org_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(org_db_id)
    .fetch_all(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch contracts: {}", e);
        ApiError::internal_server_error("Failed to fetch contracts")
    })?;

    Ok(Json(ContractsResponse { contracts }))
}

pub async fn create_contract(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CreateContractRequest>,
) -> Result<Json<ContractResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    if req.title.trim().is_empty() {
        return Err(ApiError::bad_request("Contract title must not be empty"));
    }

    let (org_db_id, _) = resolve_org(&state, &org_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Organization not found"))?;

    let role = member_role(&state, org_db_id, user.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Not a member of this organization"))?;
    if role != "admin" {
        return Err(ApiError::forbidden("Only admins can manage contracts"));
    }

    let now = chrono::Utc::now().to_rfc3339();

    let contract_id = sqlx::query(
        r#"
        INSERT INTO contracts (org_id, title, terms, starts_at, ends_at, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, 'draft', ?, ?)
        "#,
    )
    .bind(org_db_id)
    .bind(&req.title)
    .bind(&req.terms)
    .bind(&req.starts_at)
    .bind(&req.ends_at)
    .bind(&now)
    .bind(&now)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to create contract: {}", e);
        ApiError::internal_server_error("Failed to create contract")
    })?
    .last_insert_rowid();

    let contract = fetch_contract(&state, org_db_id, contract_id).await?;

    Ok(Json(ContractResponse { contract }))
}

pub async fn update_contract(
    State(state): State<AppState>,
    Path((org_id, contract_id)): Path<(String, i64)>,
    headers: HeaderMap,
    Json(req): Json<UpdateContractRequest>,
) -> Result<Json<ContractResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    if let Some(status) = req.status.as_deref() {
        if !CONTRACT_STATUSES.contains(&status) {
            return Err(ApiError::bad_request("Invalid contract status"));
        }
    }

    let (org_db_id, _) = resolve_org(&state, &org_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Organization not found"))?;

    let role = member_role(&state, org_db_id, user.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Not a member of this organization"))?;
    if role != "admin" {
        return Err(ApiError::forbidden("Only admins can manage contracts"));
    }

    let now = chrono::Utc::now().to_rfc3339();

    let result = sqlx::query(
        r#"
        UPDATE contracts
        SET title = COALESCE(?, title),
            terms = COALESCE(?, terms),
            starts_at = COALESCE(?, starts_at),
            ends_at = COALESCE(?, ends_at),
            status = COALESCE(?, status),
            updated_at = ?
        WHERE id = ? AND org_id = ?
        "#,
    )
    .bind(&req.title)
    .bind(&req.terms)
    .bind(&req.starts_at)
    .bind(&req.ends_at)
    .bind(&req.status)
    .bind(&now)
    .bind(contract_id)
    .bind(org_db_id)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to update contract: {}", e);
        ApiError::internal_server_error("Failed to update contract")
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Contract not found"));
    }

    let contract = fetch_contract(&state, org_db_id, contract_id).await?;

    Ok(Json(ContractResponse { contract }))
}

async fn fetch_contract(
    state: &AppState,
    org_id: i64,
    contract_id: i64,
) -> Result<Contract, ApiError> {
    sqlx::query_as::<_, Contract>(
        r#"
        SELECT id, org_id, title, terms, starts_at, ends_at, status, created_at, updated_at
        FROM contracts
        WHERE id = ? AND org_id = ?
        "#,
    )
    .bind(contract_id)
    .bind(org_id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch contract: {}", e);
        ApiError::internal_server_error("Failed to fetch contract")
    })?
    .ok_or_else(|| ApiError::not_found("Contract not found"))
}
